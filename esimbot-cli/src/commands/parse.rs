//! Parse command - validate an activation code and show its fields.

use esimbot::activation::ActivationCode;

use crate::error::CliError;

/// Run the parse command.
pub fn run(raw: &str) -> Result<(), CliError> {
    let code = ActivationCode::parse(raw).map_err(CliError::InvalidActivationCode)?;
    print!("{}", describe(&code));
    Ok(())
}

fn describe(code: &ActivationCode) -> String {
    format!(
        "SM-DP+ address:             {}\n\
         Matching ID:                {}\n\
         OID:                        {}\n\
         Confirmation code required: {}\n",
        code.smdp_address(),
        code.matching_id(),
        code.oid().unwrap_or("(none)"),
        if code.needs_confirmation_code() {
            "yes"
        } else {
            "no"
        }
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_lists_fields() {
        let code = ActivationCode::parse("LPA:1$smdp.example.com$ABC123$1.2.3$1").unwrap();
        let text = describe(&code);
        assert!(text.contains("SM-DP+ address:             smdp.example.com\n"));
        assert!(text.contains("Matching ID:                ABC123\n"));
        assert!(text.contains("OID:                        1.2.3\n"));
        assert!(text.contains("Confirmation code required: yes\n"));
    }

    #[test]
    fn test_invalid_code_is_an_error() {
        let err = run("not-a-code").unwrap_err();
        assert!(matches!(err, CliError::InvalidActivationCode(_)));
    }
}
