use std::sync::LazyLock;

use const_format::concatcp;
use regex::Regex;
use snafu::ensure;

use super::{ValidationError, ValidationSnafu};

pub const DNS_PREFIX_RULE: &str = "dnsPrefix";

pub const DNS_PREFIX_MIN_LENGTH: usize = 3;
pub const DNS_PREFIX_MAX_LENGTH: usize = 45;

// A letter, followed by letters, digits or hyphens, ending in a letter or digit
const DNS_PREFIX_FMT: &str = concatcp!(
    "[A-Za-z][A-Za-z0-9-]{",
    DNS_PREFIX_MIN_LENGTH - 2,
    ",",
    DNS_PREFIX_MAX_LENGTH - 2,
    "}[A-Za-z0-9]"
);

static DNS_PREFIX_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("^{DNS_PREFIX_FMT}$")).expect("failed to compile DNS prefix regex")
});

/// Checks that `dns_prefix` can be used as the leading label of the cluster's
/// DNS names.
///
/// ```
/// use clustergen_apimodel::validation::validate_dns_prefix;
///
/// assert!(validate_dns_prefix("myDNS-1234").is_ok());
/// assert!(validate_dns_prefix("1234").is_err());
/// ```
pub fn validate_dns_prefix(dns_prefix: &str) -> Result<(), ValidationError> {
    ensure!(
        DNS_PREFIX_REGEX.is_match(dns_prefix),
        ValidationSnafu {
            rule: DNS_PREFIX_RULE,
            value: dns_prefix,
            message: format!(
                "DNSPrefix '{dns_prefix}' is invalid. The DNSPrefix must contain between \
                {DNS_PREFIX_MIN_LENGTH} and {DNS_PREFIX_MAX_LENGTH} characters and can contain \
                only letters, numbers, and hyphens.  It must start with a letter and must end \
                with a letter or a number. (length was {length})",
                length = dns_prefix.len()
            ),
        }
    );

    Ok(())
}
