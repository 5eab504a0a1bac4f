use super::{EMAIL_INPUT, LOGIN_BUTTON, PASSWORD_INPUT};
use crate::config::Credentials;
use crate::Result;
use storecheck_core::{Driver, Harness};
use tracing::info;

pub struct LoginPage<'a, D> {
    h: Harness<'a, D>,
}

impl<'a, D: Driver> LoginPage<'a, D> {
    pub fn new(h: Harness<'a, D>) -> Self {
        Self { h }
    }

    /// Type the credentials with real key events and submit.
    pub async fn login(&self, creds: &Credentials) -> Result<()> {
        info!("logging in as {}", creds.email);
        let engine = self.h.engine();

        let email = self.h.find(EMAIL_INPUT).await?;
        engine.type_into(email.handle, &creds.email, EMAIL_INPUT).await?;

        let password = self.h.find(PASSWORD_INPUT).await?;
        engine
            .type_into(password.handle, &creds.password, PASSWORD_INPUT)
            .await?;

        self.h.click(LOGIN_BUTTON).await?;
        Ok(())
    }
}
