pub mod params;
pub mod schema;

pub use params::{EnvLookup, ParamDef, Params};
pub use schema::{BrowserConfig, Credentials, OnFailure, SuiteConfig, Timeouts, Viewport};
