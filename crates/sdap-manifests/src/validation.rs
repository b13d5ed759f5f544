// This is adapted from Kubernetes.
// See apimachinery/pkg/util/validation/validation.go in the Kubernetes source

use std::{fmt::Display, sync::LazyLock};

use const_format::concatcp;
use regex::Regex;
use snafu::Snafu;

/// Minimal length required by RFC 1123 is 63. Up to 255 allowed, unsupported by k8s.
const RFC_1123_LABEL_MAX_LENGTH: usize = 63;
const RFC_1123_LABEL_FMT: &str = "[a-z0-9]([-a-z0-9]*[a-z0-9])?";
const RFC_1123_LABEL_ERROR_MSG: &str = "a lowercase RFC 1123 label must consist of lower case alphanumeric characters or '-', and must start and end with an alphanumeric character";

// Services are additionally required to start with a letter
const RFC_1035_LABEL_FMT: &str = "[a-z]([-a-z0-9]*[a-z0-9])?";
const RFC_1035_LABEL_ERROR_MSG: &str = "a DNS-1035 label must consist of lower case alphanumeric characters or '-', start with an alphabetic character, and end with an alphanumeric character";
const RFC_1035_LABEL_MAX_LENGTH: usize = 63;

/// This is a subdomain's max length in DNS (RFC 1123)
const RFC_1123_SUBDOMAIN_MAX_LENGTH: usize = 253;
const RFC_1123_SUBDOMAIN_FMT: &str =
    concatcp!(RFC_1123_LABEL_FMT, "(\\.", RFC_1123_LABEL_FMT, ")*");
const RFC_1123_SUBDOMAIN_ERROR_MSG: &str = "a lowercase RFC 1123 subdomain must consist of lower case alphanumeric characters, '-' or '.', and must start and end with an alphanumeric character";

// Kubernetes accepts any C identifier as the name of an environment variable
const ENV_VAR_NAME_FMT: &str = "[A-Za-z_][A-Za-z0-9_]*";
const ENV_VAR_NAME_ERROR_MSG: &str = "an environment variable name must consist of alphanumeric characters or '_', and must not start with a digit";

// Used unescaped inside the ingress path regex, so no regex metacharacters
const PATH_SEGMENT_FMT: &str = "[A-Za-z0-9_-]+";
const PATH_SEGMENT_ERROR_MSG: &str = "a path segment must consist of alphanumeric characters, '-' or '_'";

static RFC_1123_LABEL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("^{RFC_1123_LABEL_FMT}$")).expect("failed to compile RFC 1123 label regex")
});

static RFC_1035_LABEL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("^{RFC_1035_LABEL_FMT}$")).expect("failed to compile RFC 1035 label regex")
});

static RFC_1123_SUBDOMAIN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("^{RFC_1123_SUBDOMAIN_FMT}$"))
        .expect("failed to compile RFC 1123 subdomain regex")
});

static ENV_VAR_NAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("^{ENV_VAR_NAME_FMT}$"))
        .expect("failed to compile environment variable name regex")
});

static PATH_SEGMENT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("^{PATH_SEGMENT_FMT}$")).expect("failed to compile path segment regex")
});

type Result<T = (), E = Errors> = std::result::Result<T, E>;

/// A collection of errors discovered during validation.
#[derive(Debug, PartialEq, Eq)]
pub struct Errors(Vec<Error>);

impl Display for Errors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            let prefix = match i {
                0 => "",
                _ => ", ",
            };
            write!(f, "{prefix}{error}")?;
        }
        Ok(())
    }
}
impl std::error::Error for Errors {}

/// A single validation error.
#[derive(Debug, PartialEq, Eq, Snafu)]
pub enum Error {
    #[snafu(transparent)]
    Regex { source: RegexError },

    #[snafu(display("input is {length} bytes long but must be no more than {max_length}"))]
    TooLong { length: usize, max_length: usize },
}

#[derive(Debug, PartialEq, Eq)]
pub struct RegexError {
    /// The primary error message.
    msg: &'static str,

    /// The regex that the input must match.
    regex: &'static str,

    /// Examples of valid inputs (if non-empty).
    examples: &'static [&'static str],
}

impl Display for RegexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let Self {
            msg,
            regex,
            examples,
        } = self;
        write!(f, "{msg} (")?;
        for (i, example) in examples.iter().enumerate() {
            let prefix = match i {
                0 => "e.g.",
                _ => "or",
            };
            write!(f, "{prefix} {example:?}, ")?;
        }
        write!(f, "regex used for validation is {regex:?})")
    }
}

impl std::error::Error for RegexError {}

/// Returns [`Ok`] if `value`'s length fits within `max_length`.
fn validate_str_length(value: &str, max_length: usize) -> Result<(), Error> {
    if value.len() > max_length {
        TooLongSnafu {
            length: value.len(),
            max_length,
        }
        .fail()
    } else {
        Ok(())
    }
}

/// Returns [`Ok`] if `value` matches `regex`.
fn validate_str_regex(
    value: &str,
    regex: &'static Regex,
    error_msg: &'static str,
    examples: &'static [&'static str],
) -> Result<(), Error> {
    if regex.is_match(value) {
        Ok(())
    } else {
        Err(RegexError {
            msg: error_msg,
            regex: regex
                .as_str()
                // Clean up start/end-of-line markers
                .trim_start_matches('^')
                .trim_end_matches('$'),
            examples,
        }
        .into())
    }
}

/// Returns [`Ok`] if *all* validations are [`Ok`], otherwise returns all errors.
fn validate_all(validations: impl IntoIterator<Item = Result<(), Error>>) -> Result {
    let errors = validations
        .into_iter()
        .filter_map(|res| res.err())
        .collect::<Vec<_>>();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(Errors(errors))
    }
}

/// Tests for a string that can be used as the name of a namespaced object such as a
/// `Deployment` or a `Namespace`, where Kubernetes requires a lowercase RFC 1123 label.
pub fn is_rfc_1123_label(value: &str) -> Result {
    validate_all([
        validate_str_length(value, RFC_1123_LABEL_MAX_LENGTH),
        validate_str_regex(
            value,
            &RFC_1123_LABEL_REGEX,
            RFC_1123_LABEL_ERROR_MSG,
            &["my-name", "123-abc"],
        ),
    ])
}

/// Tests for a string that can be used as the name of a `Service` (RFC 1035).
pub fn is_rfc_1035_label(value: &str) -> Result {
    validate_all([
        validate_str_length(value, RFC_1035_LABEL_MAX_LENGTH),
        validate_str_regex(
            value,
            &RFC_1035_LABEL_REGEX,
            RFC_1035_LABEL_ERROR_MSG,
            &["my-name", "abc-123"],
        ),
    ])
}

/// Tests for a string that can be used as the name of a `ConfigMap` or `ServiceAccount`.
pub fn is_rfc_1123_subdomain(value: &str) -> Result {
    validate_all([
        validate_str_length(value, RFC_1123_SUBDOMAIN_MAX_LENGTH),
        validate_str_regex(
            value,
            &RFC_1123_SUBDOMAIN_REGEX,
            RFC_1123_SUBDOMAIN_ERROR_MSG,
            &["example.com", "collections-config"],
        ),
    ])
}

pub fn is_env_var_name(value: &str) -> Result {
    validate_all([validate_str_regex(
        value,
        &ENV_VAR_NAME_REGEX,
        ENV_VAR_NAME_ERROR_MSG,
        &["AWS_ACCESS_KEY_ID", "_SECRET"],
    )])
}

pub fn is_path_segment(value: &str) -> Result {
    validate_all([validate_str_regex(
        value,
        &PATH_SEGMENT_REGEX,
        PATH_SEGMENT_ERROR_MSG,
        &["nexus", "sdap-api"],
    )])
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("")]
    #[case("-")]
    #[case("a-")]
    #[case("-a")]
    #[case("A")]
    #[case("aBc")]
    #[case("a_b")]
    #[case("a.b")]
    #[case("a b")]
    #[case(&"a".repeat(64))]
    fn is_rfc_1123_label_fail(#[case] value: &str) {
        assert!(is_rfc_1123_label(value).is_err());
    }

    #[rstest]
    #[case("a")]
    #[case("0")]
    #[case("nexus")]
    #[case("1-a")]
    #[case("a--1--2--b")]
    #[case(&"a".repeat(63))]
    fn is_rfc_1123_label_pass(#[case] value: &str) {
        assert!(is_rfc_1123_label(value).is_ok());
    }

    #[rstest]
    #[case("a", true)]
    #[case("nexus-webapp", true)]
    #[case(&"a".repeat(63), true)]
    #[case("1nexus-webapp", false)]
    #[case("-a", false)]
    #[case("a-", false)]
    #[case("Nexus", false)]
    #[case(&"a".repeat(64), false)]
    fn rfc_1035_labels(#[case] value: &str, #[case] valid: bool) {
        assert_eq!(is_rfc_1035_label(value).is_ok(), valid);
    }

    #[rstest]
    #[case("")]
    #[case(".")]
    #[case("a.")]
    #[case(".a")]
    #[case("a..b")]
    #[case("Collections")]
    #[case("a_b")]
    #[case(&"a".repeat(254))]
    fn is_rfc_1123_subdomain_fail(#[case] value: &str) {
        assert!(is_rfc_1123_subdomain(value).is_err());
    }

    #[rstest]
    #[case("collections-config")]
    #[case("sa-1")]
    #[case("a.b.c.d.e")]
    #[case("1.2.3.4.5")]
    #[case(&"a".repeat(253))]
    fn is_rfc_1123_subdomain_pass(#[case] value: &str) {
        assert!(is_rfc_1123_subdomain(value).is_ok());
    }

    #[rstest]
    #[case("AWS_ACCESS_KEY_ID", true)]
    #[case("_private", true)]
    #[case("a1", true)]
    #[case("1A", false)]
    #[case("AWS-KEY", false)]
    #[case("", false)]
    fn env_var_names(#[case] value: &str, #[case] valid: bool) {
        assert_eq!(is_env_var_name(value).is_ok(), valid);
    }

    #[rstest]
    #[case("nexus", true)]
    #[case("sdap_api-v2", true)]
    #[case("", false)]
    #[case("a/b", false)]
    #[case("nexus.*", false)]
    #[case("(x)", false)]
    fn path_segments(#[case] value: &str, #[case] valid: bool) {
        assert_eq!(is_path_segment(value).is_ok(), valid);
    }

    #[test]
    fn errors_are_collected() {
        let errors = is_rfc_1123_label(&"A".repeat(64)).unwrap_err();
        assert_eq!(errors.0.len(), 2);
        assert!(errors.to_string().starts_with("input is 64 bytes long"));
    }
}
