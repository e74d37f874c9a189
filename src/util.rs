use std::env::VarError;

use anyhow::{Result, bail};

/// Get an env var, or `fallbackvalue` if it isn't set (an error if
/// there's no fallback). Values that aren't unicode are errors.
pub fn getenv_or(name: &str, fallbackvalue: Option<&str>) -> Result<String> {
    match std::env::var(name) {
        Ok(s) => Ok(s),
        Err(e) => match e {
            VarError::NotPresent =>
                match fallbackvalue {
                    Some(v) => Ok(v.to_string()),
                    None => bail!("{name:?} env var is missing and \
                                   no default provided"),
                },
            VarError::NotUnicode(_) => bail!("{name:?} env var is not unicode"),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn t_getenv_or() {
        let name = "HTMLRENDER_TEST_SURELY_UNSET_VAR";
        assert_eq!(getenv_or(name, Some("dflt")).unwrap(), "dflt");
        assert!(getenv_or(name, None).is_err());
    }
}
