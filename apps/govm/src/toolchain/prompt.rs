//! Operator prompts.
//!
//! Interactive runs ask through `inquire`; unattended runs answer every
//! question with its fixed default.

use inquire::{Confirm, MultiSelect, Select};

use crate::errors::Result;

/// Operator decision for a cleanup run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupChoice {
    All,
    /// Indices into the removable list shown to the operator.
    Selected(Vec<usize>),
    None,
}

/// Source of operator decisions.
pub trait Prompter {
    /// Asks a yes/no question.
    ///
    /// # Errors
    ///
    /// Returns an error if the prompt cannot be shown or is interrupted.
    fn confirm(&self, message: &str, default: bool) -> Result<bool>;

    /// Asks which of `candidates` to remove.
    ///
    /// # Errors
    ///
    /// Returns an error if the prompt cannot be shown or is interrupted.
    fn choose_cleanup(&self, candidates: &[String]) -> Result<CleanupChoice>;
}

/// Terminal prompts.
#[derive(Debug, Default, Clone, Copy)]
pub struct InquirePrompter;

const REMOVE_ALL: &str = "Remove all of them";
const REMOVE_SOME: &str = "Choose which to remove";
const REMOVE_NONE: &str = "Keep everything";

impl Prompter for InquirePrompter {
    fn confirm(&self, message: &str, default: bool) -> Result<bool> {
        let answer = Confirm::new(message)
            .with_default(default)
            .with_help_message("Press Enter to accept the default")
            .prompt_skippable()?;
        Ok(answer.unwrap_or(false))
    }

    fn choose_cleanup(&self, candidates: &[String]) -> Result<CleanupChoice> {
        let mode = Select::new(
            "Remove versions other than the active one?",
            vec![REMOVE_ALL, REMOVE_SOME, REMOVE_NONE],
        )
        .prompt_skippable()?;

        match mode {
            Some(REMOVE_ALL) => Ok(CleanupChoice::All),
            Some(REMOVE_SOME) => {
                let picked = MultiSelect::new("Select versions to remove", candidates.to_vec())
                    .with_page_size(10)
                    .with_help_message("  ↑↓ navigate  space select  enter confirm  esc cancel")
                    .raw_prompt_skippable()?;
                Ok(match picked {
                    Some(options) if !options.is_empty() => {
                        CleanupChoice::Selected(options.into_iter().map(|o| o.index).collect())
                    }
                    _ => CleanupChoice::None,
                })
            }
            _ => Ok(CleanupChoice::None),
        }
    }
}

/// Answers every prompt with its default. Cleanup removes everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unattended;

impl Prompter for Unattended {
    fn confirm(&self, _message: &str, default: bool) -> Result<bool> {
        Ok(default)
    }

    fn choose_cleanup(&self, _candidates: &[String]) -> Result<CleanupChoice> {
        Ok(CleanupChoice::All)
    }
}

#[cfg(test)]
pub mod scripted {
    //! Prompter with canned answers.

    use super::{CleanupChoice, Prompter};
    use crate::errors::Result;
    use std::cell::RefCell;

    #[derive(Debug, Default)]
    pub struct Scripted {
        pub confirm: bool,
        pub choice: Option<CleanupChoice>,
        pub asked: RefCell<Vec<String>>,
    }

    impl Scripted {
        pub fn confirming(confirm: bool) -> Self {
            Self {
                confirm,
                ..Self::default()
            }
        }

        pub fn choosing(choice: CleanupChoice) -> Self {
            Self {
                choice: Some(choice),
                ..Self::default()
            }
        }
    }

    impl Prompter for Scripted {
        fn confirm(&self, message: &str, _default: bool) -> Result<bool> {
            self.asked.borrow_mut().push(message.to_string());
            Ok(self.confirm)
        }

        fn choose_cleanup(&self, candidates: &[String]) -> Result<CleanupChoice> {
            self.asked.borrow_mut().push(candidates.join(","));
            Ok(self.choice.clone().unwrap_or(CleanupChoice::None))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unattended_takes_defaults() {
        assert!(Unattended.confirm("migrate?", true).unwrap());
        assert!(!Unattended.confirm("something risky?", false).unwrap());
        assert_eq!(
            Unattended.choose_cleanup(&["1.21.0".to_string()]).unwrap(),
            CleanupChoice::All
        );
    }
}
