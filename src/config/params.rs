use crate::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;

/// Values for `${NAME}` placeholders in a suite config.
///
/// Lookup order: explicitly set values (CLI `-P`), then the process
/// environment if enabled with [`with_env`](Self::with_env), then the
/// declared default.
#[derive(Debug, Clone, Default)]
pub struct Params {
    values: HashMap<String, String>,
    env: Option<EnvLookup>,
}

/// Source of fallback values for names not set explicitly.
pub type EnvLookup = fn(&str) -> Option<String>;

fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Fall back to environment variables for names not set explicitly.
    pub fn with_env(self) -> Self {
        self.with_env_lookup(process_env)
    }

    /// Like [`with_env`](Self::with_env) with another source in place of
    /// the process environment.
    pub fn with_env_lookup(mut self, lookup: EnvLookup) -> Self {
        self.env = Some(lookup);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str())
    }

    /// Explicit value, else environment value when enabled.
    pub fn lookup(&self, key: &str) -> Option<String> {
        if let Some(v) = self.get(key) {
            return Some(v.to_string());
        }
        self.env.and_then(|lookup| lookup(key))
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Parse from CLI args like "key=value".
    pub fn from_args(args: &[String]) -> Result<Self> {
        let mut params = Self::new();
        for arg in args {
            let (key, value) = arg.split_once('=').ok_or_else(|| {
                Error::Config(format!("invalid param '{}', expected key=value", arg))
            })?;
            params.values.insert(key.to_string(), value.to_string());
        }
        Ok(params)
    }
}

/// Parameter declaration under `params:`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ParamDef {
    #[serde(default)]
    pub required: bool,

    pub default: Option<String>,

    pub description: Option<String>,

    /// Keep the value out of `check` output.
    #[serde(default)]
    pub secret: bool,
}

/// Substitute `${NAME}` placeholders in a string.
///
/// Undeclared names with no value are left untouched; declared optional
/// names with no value become empty.
pub fn substitute(
    template: &str,
    params: &Params,
    defs: &HashMap<String, ParamDef>,
) -> Result<String> {
    let mut result = template.to_string();
    let mut start = 0;

    while let Some(var_start) = result[start..].find("${") {
        let var_start = start + var_start;
        let Some(var_end) = result[var_start..].find('}') else {
            break;
        };
        let var_end = var_start + var_end;
        let var_name = &result[var_start + 2..var_end];

        let value = match (params.lookup(var_name), defs.get(var_name)) {
            (Some(v), _) => v,
            (None, Some(def)) => match (&def.default, def.required) {
                (Some(default), _) => default.clone(),
                (None, true) => {
                    return Err(Error::Config(format!(
                        "missing required parameter: {}",
                        var_name
                    )))
                }
                (None, false) => String::new(),
            },
            (None, None) => {
                start = var_end + 1;
                continue;
            }
        };

        result.replace_range(var_start..=var_end, &value);
        start = var_start + value.len();
    }

    Ok(result)
}

/// Recursively substitute params in every string of a YAML tree.
pub fn substitute_value(
    value: &mut serde_yaml::Value,
    params: &Params,
    defs: &HashMap<String, ParamDef>,
) -> Result<()> {
    match value {
        serde_yaml::Value::String(s) => {
            *s = substitute(s, params, defs)?;
        }
        serde_yaml::Value::Mapping(map) => {
            for (_, v) in map.iter_mut() {
                substitute_value(v, params, defs)?;
            }
        }
        serde_yaml::Value::Sequence(seq) => {
            for v in seq.iter_mut() {
                substitute_value(v, params, defs)?;
            }
        }
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn declared(name: &str, def: ParamDef) -> HashMap<String, ParamDef> {
        HashMap::from([(name.to_string(), def)])
    }

    #[test]
    fn test_substitute_explicit_value() {
        let params = Params::new().set("STORE_EMAIL", "qa@example.com");
        let result = substitute("user: ${STORE_EMAIL}", &params, &HashMap::new()).unwrap();
        assert_eq!(result, "user: qa@example.com");
    }

    fn fake_env(key: &str) -> Option<String> {
        (key == "STORECHECK_TEST_PRECEDENCE").then(|| "from-env".to_string())
    }

    #[test]
    fn test_explicit_beats_env_beats_default() {
        let defs = declared(
            "STORECHECK_TEST_PRECEDENCE",
            ParamDef {
                default: Some("from-default".into()),
                ..Default::default()
            },
        );
        let tpl = "${STORECHECK_TEST_PRECEDENCE}";

        let cli = Params::new()
            .set("STORECHECK_TEST_PRECEDENCE", "from-cli")
            .with_env_lookup(fake_env);
        assert_eq!(substitute(tpl, &cli, &defs).unwrap(), "from-cli");

        let env = Params::new().with_env_lookup(fake_env);
        assert_eq!(substitute(tpl, &env, &defs).unwrap(), "from-env");

        let none = Params::new();
        assert_eq!(substitute(tpl, &none, &defs).unwrap(), "from-default");
    }

    #[test]
    fn test_required_missing_is_error() {
        let defs = declared(
            "STORECHECK_TEST_UNSET_PASSWORD",
            ParamDef {
                required: true,
                ..Default::default()
            },
        );
        let err = substitute("${STORECHECK_TEST_UNSET_PASSWORD}", &Params::new().with_env_lookup(fake_env), &defs)
            .unwrap_err();
        assert!(err.to_string().contains("STORECHECK_TEST_UNSET_PASSWORD"));
    }

    #[test]
    fn test_undeclared_left_as_is() {
        let result = substitute("${nope} and ${also}", &Params::new(), &HashMap::new()).unwrap();
        assert_eq!(result, "${nope} and ${also}");
    }

    #[test]
    fn test_params_from_args() {
        let args = vec!["email=a@b.c".to_string(), "password=x=y".to_string()];
        let params = Params::from_args(&args).unwrap();
        assert_eq!(params.get("email"), Some("a@b.c"));
        assert_eq!(params.get("password"), Some("x=y"));
        assert!(Params::from_args(&["novalue".to_string()]).is_err());
    }
}
