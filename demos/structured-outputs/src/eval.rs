/// A multiple-choice question with its expected letter.
pub struct Question {
    pub question: &'static str,
    pub choices: &'static [&'static str],
    pub answer: &'static str,
}

impl Question {
    /// `"{question} \n {choices}"`, one lettered choice per line.
    pub fn prompt(&self) -> String {
        let choices = self
            .choices
            .iter()
            .zip('A'..)
            .map(|(choice, letter)| format!("{}. {}", letter, choice))
            .collect::<Vec<_>>()
            .join("\n");
        format!("{} \n {}", self.question, choices)
    }
}

/// Fraction of rows whose output equals the expected answer, ignoring
/// surrounding whitespace. Failed rows count as incorrect.
pub fn pass_rate(outputs: &[Option<&str>], answers: &[&str]) -> f64 {
    if answers.is_empty() {
        return 0.0;
    }
    let correct = outputs
        .iter()
        .zip(answers)
        .filter(|(output, answer)| output.map(str::trim) == Some(answer.trim()))
        .count();
    correct as f64 / answers.len() as f64
}

pub const QUESTIONS: &[Question] = &[
    Question {
        question: "Which organ pumps blood through the human body?",
        choices: &["lungs", "heart", "liver", "kidney"],
        answer: "B",
    },
    Question {
        question: "In a food chain, which organism is a producer?",
        choices: &["grass", "rabbit", "fox", "hawk"],
        answer: "A",
    },
    Question {
        question: "What stage follows the pupa in a butterfly life cycle?",
        choices: &["egg", "larva", "caterpillar", "adult"],
        answer: "D",
    },
    Question {
        question: "Which layer of the Earth lies directly beneath the crust?",
        choices: &["inner core", "outer core", "mantle", "atmosphere"],
        answer: "C",
    },
    Question {
        question: "Which phase of the moon is fully illuminated?",
        choices: &["full moon", "new moon", "first quarter", "waning crescent"],
        answer: "A",
    },
    Question {
        question: "What gas do plants take in for photosynthesis?",
        choices: &["oxygen", "carbon dioxide", "nitrogen", "helium"],
        answer: "B",
    },
];
