use orbit_tools::catalog::Intent;
use regex::Regex;

/// Explicit capture prefixes; the most specific signal there is.
const CAPTURE_PREFIXES: &[&str] = &["idea:", "note:", "todo:", "capture:", "remember:"];

/// Verbs that, combined with a URL in the message, mean "save this link".
const CAPTURE_VERBS: &[&str] = &["save", "capture", "bookmark", "read later", "look into", "check out"];

struct IntentRule {
    intent: Intent,
    keywords: &'static [&'static str],
    patterns: Vec<Regex>,
}

/// Deterministic keyword classifier mapping an utterance to one intent.
///
/// Rules are evaluated top-to-bottom and the FIRST match wins; several
/// categories share trigger words (a message can contain both scheduling and
/// deletion cues) and this fixed order is the tie-break policy. Explicit
/// prefixes and URL-capture checks run before any keyword rule. Pure and
/// synchronous: the result only scopes which tools are exposed, it never
/// blocks the turn.
pub struct IntentClassifier {
    url: Regex,
    rules: Vec<IntentRule>,
}

impl IntentClassifier {
    pub fn new() -> Self {
        let rules = vec![
            // Correct outranks Plan: "delete the 3pm block" is a correction
            // even though it carries a time-of-day cue.
            IntentRule {
                intent: Intent::Correct,
                keywords: &[
                    "delete", "remove", "rename", "cancel", "undo",
                    "move the", "change the", "that's wrong", "thats wrong", "instead of",
                ],
                patterns: vec![],
            },
            IntentRule {
                intent: Intent::Meta,
                keywords: &[
                    "what can you do", "who are you", "settings", "preference",
                    "how do you work",
                ],
                patterns: vec![Regex::new(r"(?i)^help[\s?!.]*$").unwrap()],
            },
            IntentRule {
                intent: Intent::Debrief,
                keywords: &[
                    "debrief", "recap", "how did", "what did i", "summary of", "wrap up",
                ],
                patterns: vec![],
            },
            IntentRule {
                intent: Intent::Reflect,
                keywords: &[
                    "journal", "reflect", "grateful", "gratitude", "mood", "i feel", "feeling",
                ],
                patterns: vec![],
            },
            IntentRule {
                intent: Intent::Brainstorm,
                keywords: &[
                    "brainstorm", "ideas for", "what if", "riff", "help me think",
                    "think through", "ways to", "options for",
                ],
                patterns: vec![],
            },
            IntentRule {
                intent: Intent::Plan,
                keywords: &[
                    "schedule", "calendar", "time-block", "timebox", "plan my",
                    "plan the", "plan for", "tomorrow", "tonight", "this afternoon",
                    "this evening",
                ],
                patterns: vec![
                    // "at 10am", "3:30 pm"
                    Regex::new(r"(?i)\b\d{1,2}(:\d{2})?\s*(am|pm)\b").unwrap(),
                ],
            },
            IntentRule {
                intent: Intent::Execute,
                keywords: &[
                    "deep work", "focus session", "pomodoro", "mark done",
                    "mark as done", "mark complete", "complete the", "finish the",
                    "log a workout", "log workout", "worked out",
                ],
                patterns: vec![],
            },
            IntentRule {
                intent: Intent::Capture,
                keywords: &[
                    "jot down", "write down", "note down", "add a task", "add task",
                    "new task", "new idea", "add an idea", "remind me to",
                    "don't forget", "dont forget", "save this", "quick note",
                    "add a note", "brain dump", "i need to", "capture",
                ],
                patterns: vec![],
            },
        ];

        Self {
            url: Regex::new(r"(?i)\bhttps?://\S+|\bwww\.\S+").unwrap(),
            rules,
        }
    }

    /// Classify one utterance. Falls back to Query, whose tool scope is
    /// everything, when nothing matches.
    pub fn classify(&self, input: &str) -> Intent {
        let trimmed = input.trim();
        let lower = trimmed.to_lowercase();

        for prefix in CAPTURE_PREFIXES {
            if lower.starts_with(prefix) {
                return Intent::Capture;
            }
        }

        if self.url.is_match(trimmed) && CAPTURE_VERBS.iter().any(|v| lower.contains(v)) {
            return Intent::Capture;
        }

        for rule in &self.rules {
            let matched = rule.patterns.iter().any(|p| p.is_match(trimmed))
                || rule.keywords.iter().any(|k| lower.contains(k));
            if matched {
                return rule.intent;
            }
        }

        Intent::Query
    }
}

impl Default for IntentClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_prefix_wins() {
        let c = IntentClassifier::new();
        assert_eq!(c.classify("idea: launch campaign"), Intent::Capture);
        assert_eq!(c.classify("note: pricing thoughts"), Intent::Capture);
        assert_eq!(c.classify("todo: renew domain"), Intent::Capture);
        // Prefix beats a scheduling cue later in the message
        assert_eq!(c.classify("idea: schedule posts at 9am daily"), Intent::Capture);
    }

    #[test]
    fn test_url_with_capture_verb() {
        let c = IntentClassifier::new();
        assert_eq!(
            c.classify("save this https://example.com/essay for later"),
            Intent::Capture
        );
        assert_eq!(c.classify("check out www.rust-lang.org"), Intent::Capture);
    }

    #[test]
    fn test_plan_vs_correct_order() {
        let c = IntentClassifier::new();
        // Both carry time cues; the deletion verb decides
        assert_eq!(c.classify("schedule a writing block at 10am"), Intent::Plan);
        assert_eq!(c.classify("delete the 3pm block"), Intent::Correct);
        assert_eq!(c.classify("move the review to friday"), Intent::Correct);
    }

    #[test]
    fn test_remaining_categories() {
        let c = IntentClassifier::new();
        assert_eq!(c.classify("brainstorm ways to grow the newsletter"), Intent::Brainstorm);
        assert_eq!(c.classify("start a deep work session"), Intent::Execute);
        assert_eq!(c.classify("how did today go?"), Intent::Debrief);
        assert_eq!(c.classify("journal about the launch"), Intent::Reflect);
        assert_eq!(c.classify("what can you do?"), Intent::Meta);
        assert_eq!(c.classify("remind me to call the bank"), Intent::Capture);
    }

    #[test]
    fn test_default_is_query() {
        let c = IntentClassifier::new();
        assert_eq!(c.classify("how many open tasks are in the pipeline"), Intent::Query);
        assert_eq!(c.classify(""), Intent::Query);
    }

    #[test]
    fn test_deterministic() {
        let c = IntentClassifier::new();
        for _ in 0..3 {
            assert_eq!(c.classify("idea: launch campaign"), Intent::Capture);
            assert_eq!(c.classify("delete the 3pm block"), Intent::Correct);
        }
    }
}
