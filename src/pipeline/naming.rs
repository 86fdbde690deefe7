//! Output naming: the file-name contract shared with the quiz packager.
//!
//! Crops are named in scan order:
//!
//! ```text
//! {prefix}{question:02}{suffix}.png   question stem  (suffix defaults to "9")
//! {prefix}{question:02}{k}.png        k-th choice of that question, k = 0, 1, …
//! ```
//!
//! The question number counts question crops from 1; the choice index
//! restarts at 0 after every question. Choices that appear before the first
//! question are numbered under question `00`. The packager finds questions
//! by probing these names, so they must not change.

use crate::pipeline::anchor::CropKind;

/// Extension of every crop image.
pub const IMAGE_EXTENSION: &str = "png";

/// File name of a question image.
pub fn question_file_name(prefix: &str, question: u32, suffix: &str) -> String {
    format!("{prefix}{question:02}{suffix}.{IMAGE_EXTENSION}")
}

/// File name of a choice image.
pub fn choice_file_name(prefix: &str, question: u32, choice: u32) -> String {
    format!("{prefix}{question:02}{choice}.{IMAGE_EXTENSION}")
}

/// A crop's position in the naming scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CropName {
    pub file_name: String,
    /// 1-based question number (0 for choices before the first question).
    pub question: u32,
    /// Choice index within the question; `None` for the question itself.
    pub choice: Option<u32>,
}

/// Assign names to crops of the given kinds, in order.
pub fn assign_names<I>(kinds: I, prefix: &str, question_suffix: &str) -> Vec<CropName>
where
    I: IntoIterator<Item = CropKind>,
{
    let mut question = 0u32;
    let mut choice = 0u32;
    kinds
        .into_iter()
        .map(|kind| match kind {
            CropKind::Question => {
                question += 1;
                choice = 0;
                CropName {
                    file_name: question_file_name(prefix, question, question_suffix),
                    question,
                    choice: None,
                }
            }
            CropKind::Choice => {
                let name = CropName {
                    file_name: choice_file_name(prefix, question, choice),
                    question,
                    choice: Some(choice),
                };
                choice += 1;
                name
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use CropKind::{Choice, Question};

    fn names(kinds: &[CropKind]) -> Vec<String> {
        assign_names(kinds.iter().copied(), "exam", "9")
            .into_iter()
            .map(|n| n.file_name)
            .collect()
    }

    #[test]
    fn question_then_choices() {
        assert_eq!(
            names(&[Question, Choice, Choice, Question, Choice]),
            vec!["exam019.png", "exam010.png", "exam011.png", "exam029.png", "exam020.png"]
        );
    }

    #[test]
    fn choices_before_first_question_use_question_zero() {
        assert_eq!(
            names(&[Choice, Choice, Question]),
            vec!["exam000.png", "exam001.png", "exam019.png"]
        );
    }

    #[test]
    fn question_numbers_past_two_digits_are_not_truncated() {
        let kinds = vec![Question; 100];
        let all = names(&kinds);
        assert_eq!(all[8], "exam099.png");
        assert_eq!(all[99], "exam1009.png");
    }

    #[test]
    fn names_form_exact_set_without_gaps() {
        // Questions with 4, 2 and 3 choices.
        let plan = [4u32, 2, 3];
        let mut kinds = Vec::new();
        for &c in &plan {
            kinds.push(Question);
            kinds.extend(std::iter::repeat(Choice).take(c as usize));
        }
        let got: BTreeSet<String> = names(&kinds).into_iter().collect();

        let mut want = BTreeSet::new();
        for (i, &c) in plan.iter().enumerate() {
            let q = i as u32 + 1;
            want.insert(question_file_name("exam", q, "9"));
            for k in 0..c {
                want.insert(choice_file_name("exam", q, k));
            }
        }
        assert_eq!(got, want);
        assert_eq!(got.len(), kinds.len());
    }

    #[test]
    fn custom_suffix_and_metadata() {
        let n = assign_names([Question, Choice], "q-", "Q");
        assert_eq!(n[0].file_name, "q-01Q.png");
        assert_eq!(n[0].choice, None);
        assert_eq!(n[1].question, 1);
        assert_eq!(n[1].choice, Some(0));
    }
}
