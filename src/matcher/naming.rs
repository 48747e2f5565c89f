//! Naming-convention primitives used by the matcher rules
//!
//! Column labels and property names are both reduced to lowercase words. Two names
//! are "exactly" equal when their words concatenate to the same string, so
//! `PART_NO`, `partNo`, `part_no` and `PARTNO` all name the same property.

/// One property name split into words
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub words: Vec<String>,
    pub joined: String,
}

impl Segment {
    pub fn new(name: &str) -> Self {
        let words = words(name);
        let joined = words.concat();
        Segment { words, joined }
    }
}

/// Split a name into lowercase words at `_`, `.`, whitespace and camel-case boundaries
///
/// # Example
///
/// ```ignore
/// assert_eq!(words("PART_DESCRIPTION"), vec!["part", "description"]);
/// assert_eq!(words("billingAddress"), vec!["billing", "address"]);
/// assert_eq!(words("XMLPayload"), vec!["xml", "payload"]);
/// ```
pub fn words(name: &str) -> Vec<String> {
    let chars: Vec<char> = name.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &ch) in chars.iter().enumerate() {
        if ch == '_' || ch == '.' || ch.is_whitespace() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }

        if ch.is_uppercase() && !current.is_empty() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|c| c.is_lowercase());
            // fooBar | XMLPayload (boundary before the P)
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_is_lower) {
                words.push(std::mem::take(&mut current));
            }
        }

        current.extend(ch.to_lowercase());
    }

    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// True when `tokens` concatenate to exactly the segment name
pub fn exact(tokens: &[String], segment: &Segment) -> bool {
    !tokens.is_empty() && tokens.concat() == segment.joined
}

/// True when `tokens` are an acceptable abbreviation of one path segment
///
/// Accepted forms, for a segment such as `billingAddress`:
/// - the exact name (`BILLING_ADDRESS`, `BILLINGADDRESS`)
/// - one token that is a prefix of the name (`BILL`, `BILLINGADDR`)
/// - one token made of the initials of a multi-word name (`BA`)
/// - k tokens, each a prefix of the corresponding leading word (`BILL_ADDR`, `B_A`)
pub fn abbreviates(tokens: &[String], segment: &Segment) -> bool {
    if tokens.is_empty() {
        return false;
    }
    if exact(tokens, segment) {
        return true;
    }

    if let [token] = tokens {
        if segment.joined.starts_with(token.as_str()) {
            return true;
        }
        return segment.words.len() >= 2
            && token.chars().count() == segment.words.len()
            && token
                .chars()
                .zip(&segment.words)
                .all(|(c, w)| w.starts_with(c));
    }

    tokens.len() <= segment.words.len()
        && tokens
            .iter()
            .zip(&segment.words)
            .all(|(t, w)| w.starts_with(t.as_str()))
}

/// True when `tokens` split into consecutive abbreviations of every segment, in order
pub fn abbreviates_all(tokens: &[String], segments: &[Segment]) -> bool {
    let Some((first, rest)) = segments.split_first() else {
        return tokens.is_empty();
    };
    if tokens.len() < segments.len() {
        return false;
    }

    // Leave at least one token for each remaining segment
    let max_take = tokens.len() - rest.len();
    (1..=max_take).any(|take| {
        abbreviates(&tokens[..take], first) && abbreviates_all(&tokens[take..], rest)
    })
}

/// Every way of splitting `tokens` into a non-empty head and a tail naming `leaf` exactly
pub fn leaf_splits<'t>(
    tokens: &'t [String],
    leaf: &'t Segment,
) -> impl Iterator<Item = &'t [String]> + 't {
    (1..tokens.len()).filter_map(move |tail_len| {
        let (head, tail) = tokens.split_at(tokens.len() - tail_len);
        exact(tail, leaf).then_some(head)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(s: &str) -> Vec<String> {
        words(s)
    }

    #[test]
    fn test_words_split_rules() {
        assert_eq!(words("PART_DESCRIPTION"), vec!["part", "description"]);
        assert_eq!(words("billingAddress"), vec!["billing", "address"]);
        assert_eq!(words("billing_address"), vec!["billing", "address"]);
        assert_eq!(words("XMLPayload"), vec!["xml", "payload"]);
        assert_eq!(words("part.partNo"), vec!["part", "part", "no"]);
        assert_eq!(words("line2Total"), vec!["line2", "total"]);
        assert!(words("__").is_empty());
    }

    #[test]
    fn test_exact_ignores_word_breaks() {
        let seg = Segment::new("part_no");
        assert!(exact(&toks("PARTNO"), &seg));
        assert!(exact(&toks("partNo"), &seg));
        assert!(!exact(&toks("PART"), &seg));
    }

    #[test]
    fn test_abbreviation_forms() {
        let seg = Segment::new("billing_address");
        assert!(abbreviates(&toks("BILLING_ADDRESS"), &seg));
        assert!(abbreviates(&toks("BILL"), &seg));
        assert!(abbreviates(&toks("BA"), &seg));
        assert!(abbreviates(&toks("BILL_ADDR"), &seg));
        assert!(!abbreviates(&toks("ADDR"), &seg));
        assert!(!abbreviates(&toks("BILL_ADDR_X"), &seg));
    }

    #[test]
    fn test_abbreviates_all_backtracks() {
        let segments = vec![Segment::new("customer"), Segment::new("billing_address")];
        assert!(abbreviates_all(&toks("CUST_BILL_ADDR"), &segments));
        assert!(abbreviates_all(&toks("C_BA"), &segments));
        assert!(!abbreviates_all(&toks("CUST"), &segments));
    }

    #[test]
    fn test_leaf_splits_requires_head() {
        let leaf = Segment::new("description");
        let tokens = toks("PART_DESCRIPTION");
        let heads: Vec<_> = leaf_splits(&tokens, &leaf).collect();
        assert_eq!(heads, vec![&tokens[..1]]);

        let only_leaf = toks("DESCRIPTION");
        assert_eq!(leaf_splits(&only_leaf, &leaf).count(), 0);
    }
}
