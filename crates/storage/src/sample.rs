//! Built-in catalogue content used when no quiz file is supplied.

use quiz_core::model::{
    DEFAULT_DURATION_SECS, QuestionDraft, QuestionKind, QuestionId, QuizDefinition, QuizDraft,
    QuizError, QuizId,
};

pub const CORPORATE_ETHICS_ID: QuizId = QuizId::new(1);

/// Five-question ethics quiz: three multiple choice, two true/false.
///
/// # Errors
///
/// Returns `QuizError` only if the embedded content stops validating.
pub fn corporate_ethics() -> Result<QuizDefinition, QuizError> {
    let mut draft = QuizDraft::new(CORPORATE_ETHICS_ID, "Corporate Ethics Training");
    draft.description =
        "This quiz assesses your understanding of corporate ethics policies.".to_owned();
    draft.duration_secs = DEFAULT_DURATION_SECS;
    draft.questions = ethics_questions();
    draft.validate()
}

fn multiple_choice(id: u64, text: &str, options: [&str; 4], correct_option: usize) -> QuestionDraft {
    QuestionDraft {
        id: QuestionId::new(id),
        text: text.to_owned(),
        kind: QuestionKind::MultipleChoice,
        options: options.iter().map(|o| (*o).to_owned()).collect(),
        correct_option,
    }
}

fn true_false(id: u64, text: &str, answer: bool) -> QuestionDraft {
    let mut draft = QuestionDraft::blank(QuestionId::new(id), QuestionKind::TrueFalse);
    draft.text = text.to_owned();
    draft.correct_option = if answer { 0 } else { 1 };
    draft
}

fn ethics_questions() -> Vec<QuestionDraft> {
    vec![
        multiple_choice(
            1,
            "Which of the following is NOT typically considered a breach of corporate ethics?",
            [
                "Sharing sensitive company information with competitors",
                "Using company resources for authorized work purposes",
                "Accepting gifts from suppliers without disclosure",
                "Hiring family members without proper declaration",
            ],
            1,
        ),
        true_false(
            2,
            "It's acceptable to use company equipment for personal purposes as long as it \
             doesn't interfere with work.",
            false,
        ),
        multiple_choice(
            3,
            "Which approach is recommended when facing an ethical dilemma at work?",
            [
                "Handle it yourself to show initiative",
                "Ignore it if it doesn't directly affect you",
                "Consult the company's code of conduct",
                "Wait for someone else to address it",
            ],
            2,
        ),
        multiple_choice(
            4,
            "Who is ultimately responsible for maintaining ethical standards within a company?",
            [
                "The CEO only",
                "The ethics committee only",
                "HR department only",
                "All employees at every level",
            ],
            3,
        ),
        true_false(
            5,
            "Whistleblower protections typically only apply to government employees, not those \
             in private companies.",
            false,
        ),
    ]
}
