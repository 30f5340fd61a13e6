//! Distinguished system Words
//!
//! Canonical (uppercase) names of the Words the engine and the rule
//! activator treat specially. Meta-circularity means these are ordinary
//! atoms; the constants only pin their spelling in one place.

/// System vocabulary
pub struct SystemVocab;

impl SystemVocab {
    /// Membership attribute used by rule activation
    pub const MEMBER_OF: &'static str = "MEMBEROF";
    /// The rule system context target
    pub const RULE: &'static str = "RULE";
    /// Context for engine-internal bookkeeping quads
    pub const SYSTEM: &'static str = "SYSTEM";
    /// Context that deactivates a reified rule
    pub const TOMBSTONE: &'static str = "TOMBSTONE";

    /// Attribute carrying a rule's match templates
    pub const MATCHES: &'static str = "MATCHES";
    /// Attribute carrying a rule's produce templates
    pub const PRODUCES: &'static str = "PRODUCES";
    /// Attribute carrying a rule's negative application conditions
    pub const NAC: &'static str = "NAC";

    /// Type attribute
    pub const TYPE: &'static str = "TYPE";
    /// Type of reified rules
    pub const RULE_TYPE: &'static str = "RULE!";
    /// Type of types
    pub const TYPE_TYPE: &'static str = "TYPE!";

    /// Attribute recording a rule firing
    pub const FIRED: &'static str = "FIRED";
    /// Attribute recording a firing's wall-clock time
    pub const TIMESTAMP: &'static str = "TIMESTAMP";
    /// Attribute written by the activator when a rule definition is rejected
    pub const DIAGNOSTIC: &'static str = "DIAGNOSTIC";

    /// Attribute requesting an effect-like operation
    pub const HANDLE: &'static str = "HANDLE";
    /// Attribute of an operation's completion marker
    pub const HANDLED: &'static str = "HANDLED";
    /// Context that operation outputs are written under
    pub const OUTPUT: &'static str = "OUTPUT";

    /// Prefix of auto-generated quad contexts (`EDGE:<id>`)
    pub const EDGE_PREFIX: &'static str = "EDGE:";
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::word;

    #[test]
    fn test_constants_are_canonical() {
        // Constants must survive Word normalisation unchanged
        for name in [
            SystemVocab::MEMBER_OF,
            SystemVocab::RULE,
            SystemVocab::SYSTEM,
            SystemVocab::TOMBSTONE,
            SystemVocab::MATCHES,
            SystemVocab::PRODUCES,
            SystemVocab::NAC,
            SystemVocab::TYPE,
            SystemVocab::RULE_TYPE,
            SystemVocab::TYPE_TYPE,
            SystemVocab::FIRED,
            SystemVocab::TIMESTAMP,
            SystemVocab::DIAGNOSTIC,
            SystemVocab::HANDLE,
            SystemVocab::HANDLED,
            SystemVocab::OUTPUT,
        ] {
            assert_eq!(word(name).as_word().unwrap().as_str().as_ref(), name);
        }
    }

    #[test]
    fn test_surface_spellings_normalise() {
        assert_eq!(word("memberOf"), word(SystemVocab::MEMBER_OF));
        assert_eq!(word("rule"), word(SystemVocab::RULE));
        assert_eq!(word("system"), word(SystemVocab::SYSTEM));
    }
}
