use crate::events::Event;
use std::fmt;

/// Predicate a suspended process waits on.
pub struct EventFilter(Box<dyn Fn(&Event) -> bool>);

impl EventFilter {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Event) -> bool + 'static,
    {
        Self(Box::new(f))
    }

    /// Accept events with exactly this tag.
    pub fn tag(tag: impl Into<String>) -> Self {
        let tag = tag.into();
        Self::new(move |e| e.tag() == tag)
    }

    /// Accept events whose tag is any of `tags`.
    pub fn tags<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tags: Vec<String> = tags.into_iter().map(Into::into).collect();
        Self::new(move |e| tags.iter().any(|t| t == e.tag()))
    }

    pub fn matches(&self, event: &Event) -> bool {
        (self.0)(event)
    }
}

impl fmt::Debug for EventFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EventFilter")
    }
}
