//! Activation code parsing.
//!
//! An activation code is the string a carrier hands out (usually as a QR code)
//! to identify the SM-DP+ server and the profile reservation on it:
//!
//! ```text
//! LPA:1$<smdp address>$<matching id>[$<oid>[$<confirmation code required flag>]]
//! ```
//!
//! When the fifth field is exactly `1` the user must also supply a
//! confirmation code before the download can start.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Scheme prefix every activation code starts with.
pub const ACTIVATION_CODE_PREFIX: &str = "LPA:1$";

/// Field separator inside an activation code.
const FIELD_SEPARATOR: char = '$';

/// Flag value in the fifth field that demands a confirmation code.
const CONFIRMATION_CODE_REQUIRED_FLAG: &str = "1";

/// Errors produced while parsing an activation code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActivationCodeError {
    /// The input does not start with [`ACTIVATION_CODE_PREFIX`].
    #[error("activation code must start with LPA:1$")]
    MissingPrefix,

    /// Fewer than three `$`-separated fields.
    #[error("activation code has {found} fields, expected at least 3")]
    TooFewFields { found: usize },

    /// A mandatory field is present but empty.
    #[error("activation code has an empty {field}")]
    EmptyField { field: &'static str },
}

/// Structured activation code descriptor.
#[derive(Clone, PartialEq, Eq)]
pub struct ActivationCode {
    smdp_address: String,
    matching_id: String,
    oid: Option<String>,
    confirmation_code: Option<String>,
    confirmation_code_required: bool,
}

impl ActivationCode {
    /// Build a descriptor directly from its parts.
    pub fn new(smdp_address: impl Into<String>, matching_id: impl Into<String>) -> Self {
        Self {
            smdp_address: smdp_address.into(),
            matching_id: matching_id.into(),
            oid: None,
            confirmation_code: None,
            confirmation_code_required: false,
        }
    }

    /// Parse a raw activation string.
    ///
    /// Surrounding whitespace is ignored. Fields past the fifth are accepted
    /// and ignored.
    pub fn parse(raw: &str) -> Result<Self, ActivationCodeError> {
        let raw = raw.trim();
        if !raw.starts_with(ACTIVATION_CODE_PREFIX) {
            return Err(ActivationCodeError::MissingPrefix);
        }

        let fields: Vec<&str> = raw.split(FIELD_SEPARATOR).collect();
        if fields.len() < 3 {
            return Err(ActivationCodeError::TooFewFields {
                found: fields.len(),
            });
        }
        if fields[1].is_empty() {
            return Err(ActivationCodeError::EmptyField {
                field: "SM-DP+ address",
            });
        }
        if fields[2].is_empty() {
            return Err(ActivationCodeError::EmptyField {
                field: "matching id",
            });
        }

        let oid = fields
            .get(3)
            .filter(|oid| !oid.is_empty())
            .map(|oid| oid.to_string());
        let confirmation_code_required = fields
            .get(4)
            .is_some_and(|flag| *flag == CONFIRMATION_CODE_REQUIRED_FLAG);

        Ok(Self {
            smdp_address: fields[1].to_string(),
            matching_id: fields[2].to_string(),
            oid,
            confirmation_code: None,
            confirmation_code_required,
        })
    }

    /// SM-DP+ server address.
    pub fn smdp_address(&self) -> &str {
        &self.smdp_address
    }

    /// Matching id of the profile reservation.
    pub fn matching_id(&self) -> &str {
        &self.matching_id
    }

    /// Object identifier of the SM-DP+ certificate, if given.
    pub fn oid(&self) -> Option<&str> {
        self.oid.as_deref()
    }

    /// Confirmation code, once supplied.
    pub fn confirmation_code(&self) -> Option<&str> {
        self.confirmation_code.as_deref()
    }

    /// Whether the code flagged that a confirmation code is needed.
    pub fn confirmation_code_required(&self) -> bool {
        self.confirmation_code_required
    }

    /// True when a confirmation code is required and has not been supplied.
    pub fn needs_confirmation_code(&self) -> bool {
        self.confirmation_code_required && self.confirmation_code.is_none()
    }

    /// Attach a confirmation code.
    pub fn set_confirmation_code(&mut self, code: impl Into<String>) {
        self.confirmation_code = Some(code.into());
    }

    /// Builder form of [`set_confirmation_code`](Self::set_confirmation_code).
    pub fn with_confirmation_code(mut self, code: impl Into<String>) -> Self {
        self.set_confirmation_code(code);
        self
    }
}

impl FromStr for ActivationCode {
    type Err = ActivationCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Renders the scheme form. The confirmation code is never part of it.
impl fmt::Display for ActivationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}${}",
            ACTIVATION_CODE_PREFIX, self.smdp_address, self.matching_id
        )?;
        if self.oid.is_some() || self.confirmation_code_required {
            write!(f, "${}", self.oid.as_deref().unwrap_or_default())?;
        }
        if self.confirmation_code_required {
            write!(f, "${}", CONFIRMATION_CODE_REQUIRED_FLAG)?;
        }
        Ok(())
    }
}

impl fmt::Debug for ActivationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActivationCode")
            .field("smdp_address", &self.smdp_address)
            .field("matching_id", &self.matching_id)
            .field("oid", &self.oid)
            .field(
                "confirmation_code",
                &self.confirmation_code.as_ref().map(|_| "<redacted>"),
            )
            .field(
                "confirmation_code_required",
                &self.confirmation_code_required,
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_minimal_code() {
        let code = ActivationCode::parse("LPA:1$smdp.example.com$ABC123").unwrap();
        assert_eq!(code.smdp_address(), "smdp.example.com");
        assert_eq!(code.matching_id(), "ABC123");
        assert_eq!(code.oid(), None);
        assert_eq!(code.confirmation_code(), None);
        assert!(!code.needs_confirmation_code());
    }

    #[test]
    fn test_parse_code_requiring_confirmation() {
        let code = ActivationCode::parse("LPA:1$smdp.example.com$ABC123$OID$1").unwrap();
        assert_eq!(code.oid(), Some("OID"));
        assert!(code.confirmation_code_required());
        assert!(code.needs_confirmation_code());

        let code = code.with_confirmation_code("9999");
        assert_eq!(code.confirmation_code(), Some("9999"));
        assert!(!code.needs_confirmation_code());
    }

    #[test]
    fn test_flag_other_than_one_does_not_require_code() {
        for raw in [
            "LPA:1$smdp.example.com$ABC123$OID$0",
            "LPA:1$smdp.example.com$ABC123$OID$",
            "LPA:1$smdp.example.com$ABC123$OID$11",
            "LPA:1$smdp.example.com$ABC123$OID",
        ] {
            let code = ActivationCode::parse(raw).unwrap();
            assert!(!code.confirmation_code_required(), "{raw}");
        }
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let code = ActivationCode::parse("  LPA:1$smdp.example.com$ABC123\n").unwrap();
        assert_eq!(code.matching_id(), "ABC123");
    }

    #[test]
    fn test_parse_rejects_missing_prefix() {
        assert_eq!(
            ActivationCode::parse("smdp.example.com$ABC123"),
            Err(ActivationCodeError::MissingPrefix)
        );
        assert_eq!(
            ActivationCode::parse(""),
            Err(ActivationCodeError::MissingPrefix)
        );
        assert_eq!(
            ActivationCode::parse("LPA:2$smdp.example.com$ABC123"),
            Err(ActivationCodeError::MissingPrefix)
        );
    }

    #[test]
    fn test_parse_rejects_too_few_fields() {
        assert_eq!(
            ActivationCode::parse("LPA:1$smdp.example.com"),
            Err(ActivationCodeError::TooFewFields { found: 2 })
        );
    }

    #[test]
    fn test_parse_rejects_empty_fields() {
        assert!(matches!(
            ActivationCode::parse("LPA:1$$ABC123"),
            Err(ActivationCodeError::EmptyField { .. })
        ));
        assert!(matches!(
            ActivationCode::parse("LPA:1$smdp.example.com$"),
            Err(ActivationCodeError::EmptyField { .. })
        ));
    }

    #[test]
    fn test_display_omits_confirmation_code() {
        let code: ActivationCode = "LPA:1$smdp.example.com$ABC123$OID$1".parse().unwrap();
        let code = code.with_confirmation_code("9999");
        assert_eq!(code.to_string(), "LPA:1$smdp.example.com$ABC123$OID$1");
        assert!(!format!("{:?}", code).contains("9999"));
    }

    proptest! {
        #[test]
        fn prop_well_formed_codes_keep_fields_verbatim(
            smdp in "[a-z0-9.-]{1,24}",
            matching in "[A-Z0-9-]{1,16}",
            tail in proptest::collection::vec("[A-Za-z0-9.]{0,8}", 0..3),
        ) {
            let mut raw = format!("LPA:1${}${}", smdp, matching);
            for field in &tail {
                raw.push('$');
                raw.push_str(field);
            }
            let code = ActivationCode::parse(&raw).unwrap();
            prop_assert_eq!(code.smdp_address(), smdp.as_str());
            prop_assert_eq!(code.matching_id(), matching.as_str());
            let required = tail.get(1).map(|f| f == "1").unwrap_or(false);
            prop_assert_eq!(code.confirmation_code_required(), required);
        }

        #[test]
        fn prop_surrounding_whitespace_is_ignored(
            smdp in "[a-z0-9.-]{1,24}",
            matching in "[A-Z0-9-]{1,16}",
            flag in prop_oneof![Just(""), Just("$OID$1"), Just("$OID$0")],
            prefix in "[ \t\n]{0,3}",
            suffix in "[ \t\n]{0,3}",
        ) {
            let bare = format!("LPA:1${}${}{}", smdp, matching, flag);
            let padded = format!("{}{}{}", prefix, bare, suffix);

            let expected = ActivationCode::parse(&bare).unwrap();
            let code = ActivationCode::parse(&padded).unwrap();
            prop_assert_eq!(code.smdp_address(), expected.smdp_address());
            prop_assert_eq!(code.matching_id(), expected.matching_id());
            prop_assert_eq!(code.oid(), expected.oid());
            prop_assert_eq!(
                code.confirmation_code_required(),
                expected.confirmation_code_required()
            );
        }

        #[test]
        fn prop_strings_without_prefix_are_rejected(raw in "[^L\\s].{0,40}") {
            prop_assert_eq!(
                ActivationCode::parse(&raw),
                Err(ActivationCodeError::MissingPrefix)
            );
        }
    }
}
