use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::core::Rut;

/// OpenFactura deployment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Production,
    #[default]
    Certification,
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "production" | "produccion" => Ok(Self::Production),
            "certification" | "certificacion" => Ok(Self::Certification),
            other => Err(format!(
                "unknown environment '{other}' (expected production or certification)"
            )),
        }
    }
}

/// Invoicing provider account, tagged by `provider`.
///
/// ```toml
/// [credentials]
/// provider = "openfactura"
/// api_key = "${OPENFACTURA_API_KEY}"
/// environment = "certification"
/// issuer_rut = "76.123.456-0"
/// ```
///
/// `provider = "none"` restricts the host to local operations (RUT tools and
/// public indicators).
#[derive(Debug, Default, Deserialize)]
#[serde(tag = "provider")]
pub enum Credentials {
    #[serde(rename = "openfactura")]
    OpenFactura {
        api_key: SecretString,
        #[serde(default)]
        environment: Environment,
        issuer_rut: Rut,
    },
    #[serde(rename = "simpleapi")]
    SimpleApi {
        api_key: SecretString,
        issuer_rut: Rut,
    },
    #[serde(rename = "none")]
    #[default]
    LocalOnly,
}

impl Credentials {
    /// Value of the `provider` tag.
    pub fn provider_name(&self) -> &'static str {
        match self {
            Self::OpenFactura { .. } => "openfactura",
            Self::SimpleApi { .. } => "simpleapi",
            Self::LocalOnly => "none",
        }
    }

    pub fn is_local_only(&self) -> bool {
        matches!(self, Self::LocalOnly)
    }

    pub fn issuer_rut(&self) -> Option<&Rut> {
        match self {
            Self::OpenFactura { issuer_rut, .. } | Self::SimpleApi { issuer_rut, .. } => {
                Some(issuer_rut)
            }
            Self::LocalOnly => None,
        }
    }

    pub fn api_key(&self) -> Option<&SecretString> {
        match self {
            Self::OpenFactura { api_key, .. } | Self::SimpleApi { api_key, .. } => Some(api_key),
            Self::LocalOnly => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn openfactura_defaults_to_certification() {
        let creds: Credentials = serde_json::from_str(
            r#"{"provider":"openfactura","api_key":"k-123","issuer_rut":"76.123.456-0"}"#,
        )
        .unwrap();
        match &creds {
            Credentials::OpenFactura {
                environment,
                issuer_rut,
                api_key,
            } => {
                assert_eq!(*environment, Environment::Certification);
                assert_eq!(issuer_rut.compact(), "76123456-0");
                assert_eq!(api_key.expose_secret(), "k-123");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(creds.provider_name(), "openfactura");
    }

    #[test]
    fn none_provider_is_local_only() {
        let creds: Credentials = serde_json::from_str(r#"{"provider":"none"}"#).unwrap();
        assert!(creds.is_local_only());
        assert!(creds.issuer_rut().is_none());
        assert!(Credentials::default().is_local_only());
    }

    #[test]
    fn bad_issuer_rut_rejected() {
        let err = serde_json::from_str::<Credentials>(
            r#"{"provider":"simpleapi","api_key":"k","issuer_rut":"76123456-1"}"#,
        );
        assert!(err.is_err());
    }

    #[test]
    fn api_key_is_redacted_in_debug() {
        let creds: Credentials = serde_json::from_str(
            r#"{"provider":"simpleapi","api_key":"super-secret","issuer_rut":"76123456-0"}"#,
        )
        .unwrap();
        assert!(!format!("{creds:?}").contains("super-secret"));
    }

    #[test]
    fn environment_parses_spanish_spelling() {
        assert_eq!(
            "produccion".parse::<Environment>().unwrap(),
            Environment::Production
        );
        assert!("staging".parse::<Environment>().is_err());
    }
}
