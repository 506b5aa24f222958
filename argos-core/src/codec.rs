//! Packed record codec for the key-value layout
//!
//! The whole index lives in one flat map of string keys to string values;
//! structure is carried by key prefixes and by the textual encoding of
//! values. Key families:
//! - `" "` (single space): the global record `"<docCount>,<totalTerms>,<freeHead>"`
//! - `"\t" + callerKey`: reverse lookup, value is the doc id in decimal
//! - `" " + docId`: per-document record `<escapedTerms>":"<docSize>","<callerKey>`
//! - any other key: a term record `<postings>":"<cfreq>`
//!
//! Pipeline output contains only word characters, so vocabulary terms can
//! never collide with the space/tab prefixes, and the `;` `=` `\` escapes
//! in stored term lists are forward-compatibility measures. They are still
//! honored byte-for-byte on both paths.
//!
//! Malformed records are a corruption condition: decoding fails with the
//! offending key named, and the surrounding operation aborts rather than
//! produce partial results.

use crate::error::{Error, Result};
use crate::{DocId, TermFreq};

/// Key of the global record.
pub const GLOBAL_KEY: &str = " ";
/// Prefix of per-document record keys.
pub const DOC_PREFIX: &str = " ";
/// Prefix of caller-key reverse-lookup keys.
pub const LOOKUP_PREFIX: &str = "\t";

/// Key of the per-document record for `doc_id`.
pub fn doc_key(doc_id: DocId) -> String {
    format!("{DOC_PREFIX}{doc_id}")
}

/// Key of the reverse-lookup record for `caller_key`.
pub fn lookup_key(caller_key: &str) -> String {
    format!("{LOOKUP_PREFIX}{caller_key}")
}

/// Parse an unsigned decimal with the strictness of `^\d+$`: no sign, no
/// whitespace, at least one digit.
pub(crate) fn parse_decimal<T: std::str::FromStr>(s: &str) -> Option<T> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Corpus-level counters stored under [`GLOBAL_KEY`].
///
/// `doc_count` is the largest id ever allocated; `total_terms` sums the
/// `doc_size` of all live documents; `free_head` points at the first
/// reusable id, threaded through per-document slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Globals {
    pub doc_count: u32,
    pub total_terms: u64,
    pub free_head: Option<DocId>,
}

impl Globals {
    pub fn encode(&self) -> String {
        match self.free_head {
            Some(id) => format!("{},{},{}", self.doc_count, self.total_terms, id),
            None => format!("{},{},", self.doc_count, self.total_terms),
        }
    }

    pub fn decode(value: &str) -> Result<Self> {
        let corrupt = || Error::Corruption(format!("global record {GLOBAL_KEY:?}: bad value {value:?}"));
        let mut fields = value.splitn(3, ',');
        let doc_count = fields
            .next()
            .and_then(parse_decimal)
            .ok_or_else(corrupt)?;
        let total_terms = fields
            .next()
            .and_then(parse_decimal)
            .ok_or_else(corrupt)?;
        let free_head = match fields.next() {
            None => return Err(corrupt()),
            Some("") => None,
            Some(raw) => Some(parse_decimal(raw).ok_or_else(corrupt)?),
        };
        Ok(Self {
            doc_count,
            total_terms,
            free_head,
        })
    }
}

/// One (doc id, in-document frequency) entry of a term record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Posting {
    pub doc_id: DocId,
    pub count: TermFreq,
}

/// Stored value for one vocabulary term: its postings in insertion order
/// plus the collection frequency.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TermRecord {
    pub postings: Vec<Posting>,
    /// Collection frequency: the sum of all posting counts.
    pub cfreq: u64,
    /// Comma fields after `cfreq`, reserved for future use; preserved
    /// verbatim on re-encode.
    pub reserved: Vec<String>,
}

impl TermRecord {
    /// Append one posting and fold its count into `cfreq`. The indexer
    /// touches each term at most once per document, so duplicates of the
    /// same doc id never arise here.
    pub fn append(&mut self, doc_id: DocId, count: TermFreq) {
        self.postings.push(Posting { doc_id, count });
        self.cfreq += u64::from(count);
    }

    /// Document frequency: the number of documents carrying this term.
    pub fn df(&self) -> usize {
        self.postings.len()
    }

    pub fn encode(&self) -> String {
        let mut out = String::new();
        for (i, posting) in self.postings.iter().enumerate() {
            if i > 0 {
                out.push(';');
            }
            out.push_str(&posting.doc_id.to_string());
            if posting.count >= 2 {
                out.push('=');
                out.push_str(&posting.count.to_string());
            }
        }
        out.push(':');
        out.push_str(&self.cfreq.to_string());
        for field in &self.reserved {
            out.push(',');
            out.push_str(field);
        }
        out
    }

    pub fn decode(term: &str, value: &str) -> Result<Self> {
        let (left, right) = value.split_once(':').ok_or_else(|| {
            Error::Corruption(format!("term record {term:?}: missing ':' in {value:?}"))
        })?;

        let mut postings = Vec::new();
        for part in left.split(';') {
            postings.push(Self::decode_posting(term, part)?);
        }

        let mut tail = right.split(',');
        let cfreq = tail
            .next()
            .and_then(parse_decimal)
            .ok_or_else(|| {
                Error::Corruption(format!("term record {term:?}: bad cfreq in {value:?}"))
            })?;
        let reserved = tail.map(str::to_string).collect();

        Ok(Self {
            postings,
            cfreq,
            reserved,
        })
    }

    /// A posting is `<docId>` (the term appears once) or `<docId>=<count>`.
    fn decode_posting(term: &str, part: &str) -> Result<Posting> {
        let corrupt =
            || Error::Corruption(format!("term record {term:?}: bad posting {part:?}"));
        match part.split_once('=') {
            Some((id, count)) => Ok(Posting {
                doc_id: parse_decimal(id).ok_or_else(corrupt)?,
                count: parse_decimal(count).ok_or_else(corrupt)?,
            }),
            None => Ok(Posting {
                doc_id: parse_decimal(part).ok_or_else(corrupt)?,
                count: 1,
            }),
        }
    }
}

/// Stored value for one document: its distinct terms with counts, the
/// total number of kept term occurrences, and the verbatim caller key.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DocRecord {
    /// Distinct terms in discovery order with their in-document counts.
    pub terms: Vec<(String, TermFreq)>,
    pub doc_size: u64,
    pub caller_key: String,
}

impl DocRecord {
    pub fn encode(&self) -> String {
        let mut out = String::new();
        for (i, (term, count)) in self.terms.iter().enumerate() {
            if i > 0 {
                out.push(';');
            }
            for c in term.chars() {
                if matches!(c, ';' | '=' | '\\') {
                    out.push('\\');
                }
                out.push(c);
            }
            if *count >= 2 {
                out.push('=');
                out.push_str(&count.to_string());
            }
        }
        out.push(':');
        out.push_str(&self.doc_size.to_string());
        out.push(',');
        out.push_str(&self.caller_key);
        out
    }

    /// Fast path for result emission: the caller key is the suffix after
    /// the final `,`, read without backtracking over the escaped term
    /// list. The key is stored unescaped, so keys containing `,` are not
    /// representable; the suffix is the caller key by definition.
    pub fn caller_key_of<'v>(key: &str, value: &'v str) -> Result<&'v str> {
        let at = value.rfind(',').ok_or_else(|| {
            Error::Corruption(format!("document record {key:?}: no caller key in {value:?}"))
        })?;
        Ok(&value[at + 1..])
    }

    /// Fast path for scoring: scan to the first unescaped `:` and parse
    /// the decimal up to the following `,`.
    pub fn doc_size_of(key: &str, value: &str) -> Result<u64> {
        let corrupt =
            || Error::Corruption(format!("document record {key:?}: bad doc size in {value:?}"));
        let colon = Self::unescaped_colon(value).ok_or_else(corrupt)?;
        let tail = &value[colon + 1..];
        let comma = tail.find(',').ok_or_else(corrupt)?;
        parse_decimal(&tail[..comma]).ok_or_else(corrupt)
    }

    /// Full decode, escape-aware. Nothing on the query path depends on the
    /// term list; it is kept parseable for forward compatibility.
    pub fn decode(key: &str, value: &str) -> Result<Self> {
        let corrupt = |what: &str| Error::Corruption(format!("document record {key:?}: {what} in {value:?}"));

        let colon = Self::unescaped_colon(value).ok_or_else(|| corrupt("missing ':'"))?;
        let tail = &value[colon + 1..];
        let comma = tail.find(',').ok_or_else(|| corrupt("missing caller key"))?;
        let doc_size = parse_decimal(&tail[..comma]).ok_or_else(|| corrupt("bad doc size"))?;
        let caller_key = tail[comma + 1..].to_string();

        let mut terms = Vec::new();
        if colon > 0 {
            for raw in split_unescaped(&value[..colon], ';') {
                let (term, count) = decode_term_entry(&raw).ok_or_else(|| corrupt("bad term entry"))?;
                terms.push((term, count));
            }
        }

        Ok(Self {
            terms,
            doc_size,
            caller_key,
        })
    }

    /// Byte offset of the first `:` not preceded by a `\` escape.
    fn unescaped_colon(value: &str) -> Option<usize> {
        let bytes = value.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'\\' => i += 2,
                b':' => return Some(i),
                _ => i += 1,
            }
        }
        None
    }
}

/// Split on an unescaped separator, leaving escapes in place for the
/// per-entry decoder.
fn split_unescaped(input: &str, separator: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut chars = input.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            current.push(c);
            if let Some(escaped) = chars.next() {
                current.push(escaped);
            }
        } else if c == separator {
            parts.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    parts.push(current);
    parts
}

/// Decode one `term` or `term=count` entry, resolving escapes.
fn decode_term_entry(raw: &str) -> Option<(String, TermFreq)> {
    let mut term = String::new();
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => term.push(chars.next()?),
            '=' => {
                let count = parse_decimal(chars.as_str())?;
                if term.is_empty() {
                    return None;
                }
                return Some((term, count));
            }
            _ => term.push(c),
        }
    }
    if term.is_empty() {
        return None;
    }
    Some((term, 1))
}

/// Decode the payload of a freed per-document slot: the next free id in
/// decimal, or empty at the tail of the list. A freed slot overwritten by
/// a live record means the free list no longer describes reality, which is
/// corruption.
pub fn decode_free_slot(key: &str, value: &str) -> Result<Option<DocId>> {
    if value.is_empty() {
        return Ok(None);
    }
    match parse_decimal(value) {
        Some(next) => Ok(Some(next)),
        None => Err(Error::Corruption(format!(
            "free-list slot {key:?} holds a live record"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_globals_round_trip() {
        for globals in [
            Globals::default(),
            Globals {
                doc_count: 17,
                total_terms: 420,
                free_head: None,
            },
            Globals {
                doc_count: 9,
                total_terms: 12,
                free_head: Some(4),
            },
        ] {
            assert_eq!(Globals::decode(&globals.encode()).unwrap(), globals);
        }
    }

    #[test]
    fn test_globals_encoding_shape() {
        let globals = Globals {
            doc_count: 3,
            total_terms: 11,
            free_head: None,
        };
        assert_eq!(globals.encode(), "3,11,");
    }

    #[test]
    fn test_globals_rejects_malformed() {
        for bad in ["", "3", "3,4", "a,b,c", "3,4,x", "-1,0,"] {
            assert!(matches!(Globals::decode(bad), Err(Error::Corruption(_))));
        }
    }

    #[test]
    fn test_term_record_append_and_encode() {
        let mut record = TermRecord::default();
        record.append(3, 1);
        record.append(7, 4);
        assert_eq!(record.encode(), "3;7=4:5");
        assert_eq!(record.df(), 2);
    }

    #[test]
    fn test_term_record_decode_both_posting_shapes() {
        let record = TermRecord::decode("fox", "12;9=2;4:4").unwrap();
        assert_eq!(
            record.postings,
            vec![
                Posting { doc_id: 12, count: 1 },
                Posting { doc_id: 9, count: 2 },
                Posting { doc_id: 4, count: 1 },
            ]
        );
        assert_eq!(record.cfreq, 4);
    }

    #[test]
    fn test_term_record_round_trip() {
        let mut record = TermRecord::default();
        record.append(1, 2);
        record.append(2, 1);
        record.append(30, 7);
        let decoded = TermRecord::decode("t", &record.encode()).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_term_record_preserves_reserved_fields() {
        let record = TermRecord::decode("t", "5=2:2,future,fields").unwrap();
        assert_eq!(record.reserved, vec!["future", "fields"]);
        assert_eq!(record.encode(), "5=2:2,future,fields");
    }

    #[test]
    fn test_term_record_rejects_malformed() {
        for bad in ["", "5", "x:1", "5=:1", "5=2:", "5;;6:2", "5=2=3:5"] {
            assert!(
                matches!(TermRecord::decode("t", bad), Err(Error::Corruption(_))),
                "accepted {bad:?}"
            );
        }
    }

    #[test]
    fn test_doc_record_encoding_shape() {
        let record = DocRecord {
            terms: vec![("world".to_string(), 1), ("crazi".to_string(), 2)],
            doc_size: 3,
            caller_key: "doc-3".to_string(),
        };
        assert_eq!(record.encode(), "world;crazi=2:3,doc-3");
    }

    #[test]
    fn test_doc_record_fast_paths() {
        let value = "world;crazi=2:3,doc-3";
        assert_eq!(DocRecord::caller_key_of(" 1", value).unwrap(), "doc-3");
        assert_eq!(DocRecord::doc_size_of(" 1", value).unwrap(), 3);
    }

    #[test]
    fn test_doc_record_empty_term_list() {
        // A document of nothing but stop words still gets a record.
        let record = DocRecord {
            terms: Vec::new(),
            doc_size: 0,
            caller_key: "empty".to_string(),
        };
        let value = record.encode();
        assert_eq!(value, ":0,empty");
        assert_eq!(DocRecord::doc_size_of(" 2", &value).unwrap(), 0);
        assert_eq!(DocRecord::decode(" 2", &value).unwrap(), record);
    }

    #[test]
    fn test_doc_record_escape_round_trip() {
        let record = DocRecord {
            terms: vec![
                ("a;b".to_string(), 1),
                ("c=d".to_string(), 3),
                ("e\\f".to_string(), 1),
            ],
            doc_size: 5,
            caller_key: "weird".to_string(),
        };
        let value = record.encode();
        assert_eq!(value, "a\\;b;c\\=d=3;e\\\\f:5,weird");
        assert_eq!(DocRecord::decode(" 4", &value).unwrap(), record);
        assert_eq!(DocRecord::doc_size_of(" 4", &value).unwrap(), 5);
    }

    #[test]
    fn test_doc_record_rejects_malformed() {
        for bad in ["", "term", "term:x,key", "term:5"] {
            assert!(
                matches!(DocRecord::doc_size_of(" 1", bad), Err(Error::Corruption(_))),
                "accepted {bad:?}"
            );
        }
    }

    #[test]
    fn test_free_slot_decoding() {
        assert_eq!(decode_free_slot(" 3", "").unwrap(), None);
        assert_eq!(decode_free_slot(" 3", "12").unwrap(), Some(12));
        assert!(matches!(
            decode_free_slot(" 3", "world:2,key"),
            Err(Error::Corruption(_))
        ));
    }

    #[test]
    fn test_keys() {
        assert_eq!(doc_key(41), " 41");
        assert_eq!(lookup_key("report.txt"), "\treport.txt");
        assert_ne!(doc_key(1), GLOBAL_KEY);
    }
}
