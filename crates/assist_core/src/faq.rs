use anyhow::{ensure, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One (question, answer) pair of the knowledge base, before embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaqPair {
    pub question: String,
    pub answer: String,
}

impl FaqPair {
    /// Pairs up parallel question/answer lists, the shape the data has when
    /// it is maintained as two columns. Positional identity is the only link
    /// between a question and its answer, so the lengths must agree.
    pub fn zip(questions: Vec<String>, answers: Vec<String>) -> Result<Vec<FaqPair>> {
        ensure!(
            questions.len() == answers.len(),
            "question/answer count mismatch: {} questions, {} answers",
            questions.len(),
            answers.len()
        );
        Ok(questions
            .into_iter()
            .zip(answers)
            .map(|(question, answer)| FaqPair { question, answer })
            .collect())
    }
}

/// A pair together with the embedding of its question, computed once when the
/// knowledge base is loaded and immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaqEntry {
    pub question: String,
    pub answer: String,
    pub embedding: Vec<f32>,
    pub created_at: DateTime<Utc>,
}

/// The platform's stock FAQ content.
pub fn builtin() -> Vec<FaqPair> {
    let pairs = [
        // Project showcase
        (
            "How can I upload a project?",
            "Go to your profile and click 'Add Project' to upload project details.",
        ),
        (
            "Can I add images or videos to my project?",
            "Yes, you can attach images, videos, and documents to showcase your project better.",
        ),
        (
            "How do I share my GitHub link?",
            "When adding a project, you can paste your GitHub or live demo link.",
        ),
        (
            "Where will my projects be shown?",
            "Your projects will appear on your profile and in the project showcase section.",
        ),
        (
            "Can others see and comment on my projects?",
            "Yes, other students can view and interact with your projects.",
        ),
        // Peer networking
        (
            "How do I follow other students?",
            "Click the 'Follow' button on a student's profile to follow them.",
        ),
        (
            "Will I get updates when someone posts a new project?",
            "Yes, you'll be notified when someone you follow uploads a new project or update.",
        ),
        (
            "Can I unfollow someone later?",
            "Yes, you can unfollow anytime from their profile.",
        ),
        (
            "How do I build my network?",
            "Engage with projects, follow peers, and join chats to build your network.",
        ),
        // Real-time chat
        (
            "How do I join a public chat room?",
            "Go to the chat section and select the room you want to join.",
        ),
        (
            "What chat rooms are available?",
            "Common chat rooms include General, Projects, and Help.",
        ),
        (
            "Can I message someone privately?",
            "Yes, you can send private one-on-one messages.",
        ),
        (
            "Is chat available on mobile?",
            "Yes, the chat feature is available on both desktop and mobile.",
        ),
        // Coding leaderboards
        (
            "What is the leaderboard for?",
            "The leaderboard shows top performers based on coding activity.",
        ),
        (
            "How is ranking calculated?",
            "Ranking is calculated from GitHub commits and LeetCode problems solved.",
        ),
        (
            "Does it track GitHub activity?",
            "Yes, your GitHub contributions are tracked.",
        ),
        (
            "Can I connect my LeetCode account?",
            "Yes, you can connect your LeetCode account from your profile settings.",
        ),
        (
            "How often is the leaderboard updated?",
            "The leaderboard is updated daily to reflect your progress.",
        ),
        // LinkedIn integration
        (
            "How do I link my LinkedIn account?",
            "You can link your LinkedIn account from your profile settings.",
        ),
        (
            "Will my LinkedIn posts show automatically?",
            "Yes, your latest LinkedIn posts will automatically appear on your feed.",
        ),
        (
            "Can I remove my LinkedIn integration?",
            "Yes, you can remove LinkedIn integration anytime from settings.",
        ),
        // User profiles
        (
            "How do I update my profile?",
            "Go to your profile page and click 'Edit' to update your details.",
        ),
        (
            "What details can I add to my profile?",
            "You can add skills, certifications, projects, achievements, and links to external profiles.",
        ),
        (
            "Can I link my GitHub and LeetCode profiles?",
            "Yes, you can link GitHub, LinkedIn, and LeetCode accounts from your profile.",
        ),
        (
            "Can I add certifications and skills to my profile?",
            "Yes, certifications and skills can be added under the profile section.",
        ),
        (
            "Who can view my profile?",
            "Your profile is visible to other students and mentors on the platform.",
        ),
        // General
        (
            "What is this website about?",
            "This platform helps students showcase projects, connect with peers, and grow professionally.",
        ),
        (
            "Who is this website for?",
            "It is mainly designed for students who want to build their career profile and network.",
        ),
        (
            "Is there a free plan?",
            "Yes, we offer a free plan with limited features.",
        ),
        (
            "How do I contact support?",
            "You can reach us at support@example.com or through the Help page.",
        ),
        (
            "I forgot my password, what do I do?",
            "Click 'Forgot Password' on the login page and follow the steps.",
        ),
        (
            "Website not loading, what should I do?",
            "Please clear cache or try another browser. If the problem continues, contact support.",
        ),
        (
            "Site looks different on mobile, is that normal?",
            "The site is mobile-friendly, but some features are best used on desktop.",
        ),
    ];

    pairs
        .into_iter()
        .map(|(question, answer)| FaqPair {
            question: question.to_string(),
            answer: answer.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zip_requires_equal_lengths() {
        let qs = vec!["q1".to_string(), "q2".to_string()];
        let ans = vec!["a1".to_string()];
        assert!(FaqPair::zip(qs, ans).is_err());

        let qs = vec!["q1".to_string()];
        let ans = vec!["a1".to_string()];
        let pairs = FaqPair::zip(qs, ans).unwrap();
        assert_eq!(pairs[0].answer, "a1");
    }

    #[test]
    fn builtin_has_distinct_questions() {
        let pairs = builtin();
        assert_eq!(pairs.len(), 33);
        let mut questions: Vec<&str> = pairs.iter().map(|p| p.question.as_str()).collect();
        questions.sort_unstable();
        questions.dedup();
        assert_eq!(questions.len(), pairs.len());
    }
}
