use crate::{Error, Result};
use std::fmt;
use std::io::{BufRead, Write};
use std::sync::Mutex;
use tracing::debug;

/// Portal login: username, password and office key.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub office_key: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("office_key", &"<redacted>")
            .finish()
    }
}

/// A source of login credentials.
pub trait CredentialProvider {
    fn name(&self) -> &str;

    /// `Ok(None)` when this source has nothing (or only part of a set).
    fn credentials(&self) -> Result<Option<Credentials>>;
}

/// Reads `{prefix}USERNAME`, `{prefix}PASSWORD` and `{prefix}OFFICEKEY`.
#[derive(Debug, Clone)]
pub struct EnvCredentials {
    prefix: String,
}

impl EnvCredentials {
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    fn var(&self, name: &str) -> Option<String> {
        std::env::var(format!("{}{}", self.prefix, name))
            .ok()
            .filter(|v| !v.trim().is_empty())
    }
}

impl Default for EnvCredentials {
    fn default() -> Self {
        Self::with_prefix("AMD_")
    }
}

impl CredentialProvider for EnvCredentials {
    fn name(&self) -> &str {
        "environment"
    }

    fn credentials(&self) -> Result<Option<Credentials>> {
        Ok(complete(
            self.var("USERNAME"),
            self.var("PASSWORD"),
            self.var("OFFICEKEY"),
        ))
    }
}

/// Asks for each value on a terminal.
///
/// The password is read like any other line; there is no echo suppression.
pub struct PromptCredentials<R, W> {
    io: Mutex<(R, W)>,
}

impl<R: BufRead, W: Write> PromptCredentials<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            io: Mutex::new((input, output)),
        }
    }
}

impl PromptCredentials<std::io::StdinLock<'static>, std::io::Stderr> {
    pub fn terminal() -> Self {
        Self::new(std::io::stdin().lock(), std::io::stderr())
    }
}

impl<R: BufRead, W: Write> CredentialProvider for PromptCredentials<R, W> {
    fn name(&self) -> &str {
        "prompt"
    }

    fn credentials(&self) -> Result<Option<Credentials>> {
        let mut io = self
            .io
            .lock()
            .map_err(|_| Error::ActionFailed("credential prompt poisoned".into()))?;
        let (input, output) = &mut *io;
        let mut ask = |label: &str| -> Result<Option<String>> {
            write!(output, "{}: ", label)?;
            output.flush()?;
            let mut line = String::new();
            input.read_line(&mut line)?;
            let value = line.trim_end_matches(['\r', '\n']).to_string();
            Ok(Some(value).filter(|v| !v.trim().is_empty()))
        };
        let username = ask("Username")?;
        let password = ask("Password")?;
        let office_key = ask("Office key")?;
        Ok(complete(username, password, office_key))
    }
}

fn complete(
    username: Option<String>,
    password: Option<String>,
    office_key: Option<String>,
) -> Option<Credentials> {
    Some(Credentials {
        username: username?,
        password: password?,
        office_key: office_key?,
    })
}

/// First complete set of credentials, asking providers in order.
pub fn resolve_credentials(providers: &[&dyn CredentialProvider]) -> Result<Credentials> {
    for provider in providers {
        if let Some(credentials) = provider.credentials()? {
            debug!("Using credentials from {}", provider.name());
            return Ok(credentials);
        }
        debug!("No credentials from {}", provider.name());
    }
    Err(Error::MissingCredentials)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Cursor;

    struct Fixed(Option<Credentials>);

    impl CredentialProvider for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        fn credentials(&self) -> Result<Option<Credentials>> {
            Ok(self.0.clone())
        }
    }

    fn creds(user: &str) -> Credentials {
        Credentials {
            username: user.into(),
            password: "pw".into(),
            office_key: "1234".into(),
        }
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let out = format!("{:?}", creds("jane"));
        assert!(out.contains("jane"));
        assert!(!out.contains("pw"));
        assert!(!out.contains("1234"));
    }

    #[test]
    fn test_first_complete_provider_wins() {
        let empty = Fixed(None);
        let first = Fixed(Some(creds("first")));
        let second = Fixed(Some(creds("second")));
        let got = resolve_credentials(&[&empty, &first, &second]).unwrap();
        assert_eq!(got.username, "first");
    }

    #[test]
    fn test_no_provider_is_an_error() {
        let empty = Fixed(None);
        let err = resolve_credentials(&[&empty]).unwrap_err();
        assert!(matches!(err, Error::MissingCredentials));
    }

    #[test]
    #[serial]
    fn test_env_credentials() {
        std::env::set_var("ALEXTEST_USERNAME", "jane");
        std::env::set_var("ALEXTEST_PASSWORD", "secret");
        std::env::set_var("ALEXTEST_OFFICEKEY", "99");
        let env = EnvCredentials::with_prefix("ALEXTEST_");
        let got = env.credentials().unwrap().unwrap();
        assert_eq!(got, creds_full("jane", "secret", "99"));

        // a partial set is no set
        std::env::set_var("ALEXTEST_OFFICEKEY", "");
        assert!(env.credentials().unwrap().is_none());

        for name in ["USERNAME", "PASSWORD", "OFFICEKEY"] {
            std::env::remove_var(format!("ALEXTEST_{}", name));
        }
    }

    fn creds_full(user: &str, password: &str, office_key: &str) -> Credentials {
        Credentials {
            username: user.into(),
            password: password.into(),
            office_key: office_key.into(),
        }
    }

    #[test]
    fn test_prompt_reads_three_lines() {
        let input = Cursor::new("jane\r\nsecret\n42\n");
        let mut output = Vec::new();
        let got = PromptCredentials::new(input, &mut output)
            .credentials()
            .unwrap()
            .unwrap();
        assert_eq!(got, creds_full("jane", "secret", "42"));
        let shown = String::from_utf8(output).unwrap();
        assert!(shown.contains("Office key: "), "{}", shown);
    }

    #[test]
    fn test_prompt_with_blank_answer() {
        let input = Cursor::new("jane\n\n42\n");
        let got = PromptCredentials::new(input, Vec::new()).credentials().unwrap();
        assert!(got.is_none());
    }
}
