/// Characters allowed unquoted in the local part, besides ASCII alphanumerics.
const LOCAL_SPECIALS: &str = "!#$%&'*+/=?^_`{|}~-";

/// Syntactic email check: `local@domain` with a dot-atom local part and a
/// dotted domain whose final label is at least two characters.
pub fn is_valid_email(value: &str) -> bool {
    let Some((local, domain)) = value.rsplit_once('@') else {
        return false;
    };
    valid_local(local) && valid_domain(domain)
}

fn valid_local(local: &str) -> bool {
    !local.is_empty()
        && local.split('.').all(|atom| {
            !atom.is_empty()
                && atom
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || LOCAL_SPECIALS.contains(c))
        })
}

fn valid_domain(domain: &str) -> bool {
    if domain == "localhost" {
        return true;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    let Some((tld, rest)) = labels.split_last() else {
        return false;
    };
    !rest.is_empty() && rest.iter().all(|label| valid_label(label)) && valid_tld(tld)
}

fn valid_label(label: &str) -> bool {
    (1..=63).contains(&label.len())
        && !label.starts_with('-')
        && !label.ends_with('-')
        && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

fn valid_tld(tld: &str) -> bool {
    (2..=63).contains(&tld.len())
        && !tld.ends_with('-')
        && tld.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ordinary_addresses() {
        for email in [
            "voter@example.com",
            "first.last+tag@mail.example.org",
            "o'neil@sub-domain.example.co",
            "admin@localhost",
        ] {
            assert!(is_valid_email(email), "{email}");
        }
    }

    #[test]
    fn rejects_malformed_addresses() {
        for email in [
            "",
            "voter",
            "@example.com",
            "voter@",
            "voter@example",
            "voter@example.c",
            "voter@-example.com",
            "voter@example..com",
            ".voter@example.com",
            "vo..ter@example.com",
            "vo ter@example.com",
            "voter@exa mple.com",
        ] {
            assert!(!is_valid_email(email), "{email}");
        }
    }
}
