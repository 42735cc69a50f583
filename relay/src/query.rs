//! Extraction of the relay parameters from a hop's query string, and the
//! derivation of the query the next hop receives.

use url::form_urlencoded;

pub const PASS_PARAM: &str = "pass";
pub const THREAD_PARAM: &str = "thread";

/// Recorded in place of a thread id when the caller did not send one.
pub const THREAD_NONE: &str = "none";

/// Relay parameters of a single hop, after defaulting and increment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HopParams {
    /// Hop counter for this node: the received value plus one.
    pub pass: i64,
    /// Thread id exactly as the caller supplied it, if at all.
    pub thread: Option<String>,
}

impl HopParams {
    /// Never fails: a missing or non-integer `pass` counts as 0 and a missing
    /// `thread` stays `None`. Repeated parameters resolve to their last value.
    pub fn from_query(query: Option<&str>) -> Self {
        let pairs = parse_pairs(query);

        let received = last_value(&pairs, PASS_PARAM)
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(0);

        HopParams {
            pass: received.saturating_add(1),
            thread: last_value(&pairs, THREAD_PARAM).map(str::to_string),
        }
    }

    /// Thread id as it appears in the hop's metadata record.
    pub fn thread_or_none(&self) -> &str {
        self.thread.as_deref().unwrap_or(THREAD_NONE)
    }

    /// Query string for the next hop.
    ///
    /// Parameters other than `pass` and `thread` keep their order; `pass` is
    /// then appended with the incremented value, followed by `thread` only
    /// when the caller supplied one.
    pub fn next_query(&self, query: Option<&str>) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());

        for (key, value) in parse_pairs(query) {
            if key != PASS_PARAM && key != THREAD_PARAM {
                serializer.append_pair(&key, &value);
            }
        }

        serializer.append_pair(PASS_PARAM, &self.pass.to_string());
        if let Some(thread) = &self.thread {
            serializer.append_pair(THREAD_PARAM, thread);
        }

        serializer.finish()
    }
}

fn parse_pairs(query: Option<&str>) -> Vec<(String, String)> {
    form_urlencoded::parse(query.unwrap_or_default().as_bytes())
        .into_owned()
        .collect()
}

/// The value of the last occurrence of `name`, if any.
pub fn last_value<'a>(pairs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    pairs
        .iter()
        .rev()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}
