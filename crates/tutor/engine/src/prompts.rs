//! Fixed instruction templates sent to the completion service.
//!
//! Each template is parameterized only by the user's text. The correction
//! and explanation templates together produce the feedback annotation; the
//! explanation is deliberately in Spanish for learners more comfortable
//! reading feedback in their first language.

/// Conversational-reply instruction for the reply task.
pub fn reply_instruction(text: &str) -> String {
    format!(
        "Engage in a simple conversation in response to the message: '{text}'. \
         Keep it concise and suitable for an A2 English learner."
    )
}

/// Grammar-correction instruction, first half of the feedback annotation.
pub fn correction_instruction(text: &str) -> String {
    format!(
        "Review the English sentence: \"{text}\". If there are significant grammatical \
         or structural errors, start with \"Could be improved\", then provide a concise \
         corrected English sentence. Else, simply state \"No improvements needed.\" \
         Avoid focusing on minor details like punctuation and capitalization."
    )
}

/// Spanish-language explanation instruction, second half of the feedback
/// annotation.
pub fn explanation_instruction(text: &str) -> String {
    format!(
        "Basándose en la oración en inglés: \"{text}\", identifica errores significativos \
         de gramática y estructura. Si hay errores, ofrece una breve explicación y \
         sugerencia en inglés. Si la oración está correcta, simplemente afirma \
         \"La oración está correcta\"."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn templates_embed_the_user_text() {
        let text = "I has a cat";
        assert!(reply_instruction(text).contains("'I has a cat'"));
        assert!(correction_instruction(text).contains("\"I has a cat\""));
        assert!(explanation_instruction(text).contains("\"I has a cat\""));
    }

    #[test]
    fn reply_template_targets_a2_learners() {
        assert!(reply_instruction("hi").contains("A2 English learner"));
    }
}
