//! The fixed guild application questionnaire.

/// Ordered application questions, fixed for the lifetime of the process.
pub const QUESTIONS: [&str; 7] = [
    "What is your in-game name and main character/class?",
    "How long have you been playing, and what content do you enjoy most?",
    "Which timezone are you in, and when are you usually online?",
    "Have you been in a guild before? If so, why did you leave?",
    "What do you expect from our guild, and what can you bring to it?",
    "How did you hear about us? Do you know any current members?",
    "Is there anything else you would like the officers to know?",
];

/// Read-only view over an ordered list of questions.
///
/// An index `i` used against a questionnaire satisfies `0 <= i <= len()`,
/// where `i == len()` means every question has been answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Questionnaire {
    questions: &'static [&'static str],
}

impl Questionnaire {
    pub const fn new(questions: &'static [&'static str]) -> Self {
        Self { questions }
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&'static str> {
        self.questions.get(index).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.questions.iter().copied()
    }

    /// Prompt text shown to the applicant, e.g. `"**Question 2/7:** ..."`.
    pub fn prompt(&self, index: usize) -> Option<String> {
        self.get(index)
            .map(|q| format!("**Question {}/{}:** {}", index + 1, self.len(), q))
    }
}

impl Default for Questionnaire {
    fn default() -> Self {
        Self::new(&QUESTIONS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_questionnaire() {
        let q = Questionnaire::default();
        assert_eq!(q.len(), 7);
        assert_eq!(q.get(0), Some(QUESTIONS[0]));
        assert_eq!(q.get(7), None);
    }

    #[test]
    fn test_prompt_is_one_based() {
        let q = Questionnaire::default();
        let prompt = q.prompt(1).unwrap();
        assert!(prompt.starts_with("**Question 2/7:**"));
        assert!(q.prompt(7).is_none());
    }
}
