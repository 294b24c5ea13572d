//! Deterministic reference agent.
//!
//! A `KeywordAgent` reasons only with its expertise keywords: it proposes the
//! keyword that best matches the task, votes for the option sharing most of its
//! keywords, and flags keywords a proposal leaves out. Same inputs, same answers.

use crate::config::FileAgentEntry;
use async_trait::async_trait;
use edrr_application::{Agent, AgentError};
use edrr_domain::{AgentId, Context, Critique, CycleTask, Proposal, Vote};

#[derive(Debug, Clone)]
pub struct KeywordAgent {
    id: AgentId,
    expertise: Vec<String>,
    weight: f64,
}

impl KeywordAgent {
    pub fn new(id: impl Into<AgentId>) -> Self {
        Self {
            id: id.into(),
            expertise: Vec::new(),
            weight: 1.0,
        }
    }

    pub fn with_expertise<I, S>(mut self, expertise: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.expertise = expertise
            .into_iter()
            .map(|e| e.into().to_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn from_entry(entry: &FileAgentEntry) -> Self {
        Self::new(entry.name.trim())
            .with_expertise(entry.expertise.iter().cloned())
            .with_weight(entry.weight)
    }

    fn matches<'a>(&'a self, text: &'a str) -> impl Iterator<Item = &'a String> + 'a {
        self.expertise.iter().filter(move |kw| text.contains(kw.as_str()))
    }

    /// The option label this agent argues for on `task`.
    fn preferred_option(&self, task: &CycleTask) -> String {
        let text = task.search_text();
        self.matches(&text)
            .next()
            .or_else(|| self.expertise.first())
            .cloned()
            .unwrap_or_else(|| self.id.to_string())
    }
}

#[async_trait]
impl Agent for KeywordAgent {
    fn id(&self) -> &AgentId {
        &self.id
    }

    fn expertise(&self) -> &[String] {
        &self.expertise
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    async fn propose(&self, task: &CycleTask, _context: &Context) -> Result<Proposal, AgentError> {
        let option = self.preferred_option(task);
        let content = format!(
            "Approach '{}' with a focus on {}",
            task.description, option
        );
        Ok(Proposal::new(self.id.clone(), option, content))
    }

    async fn review(&self, proposal: &Proposal) -> Result<Critique, AgentError> {
        let content = proposal.content.to_lowercase();
        let missing: Vec<&String> = self
            .expertise
            .iter()
            .filter(|kw| !content.contains(kw.as_str()))
            .collect();

        if missing.is_empty() {
            return Ok(Critique::default());
        }
        let concerns = missing.iter().map(|kw| format!("does not address {kw}"));
        let revision = format!(
            "{}, also covering {}",
            proposal.content,
            missing
                .iter()
                .map(|kw| kw.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
        Ok(Critique::new(concerns).with_revision(revision))
    }

    async fn vote(&self, options: &[String], _context: &Context) -> Result<Vote, AgentError> {
        let Some(first) = options.first() else {
            return Err(AgentError::InvalidResponse {
                agent: self.id.to_string(),
                reason: "no options to vote on".to_string(),
            });
        };

        // Highest keyword overlap wins; earlier options win ties.
        let (choice, overlap) = options.iter().fold((first, 0usize), |best, option| {
            let overlap = self.matches(&option.to_lowercase()).count();
            if overlap > best.1 { (option, overlap) } else { best }
        });

        let rationale = if overlap > 0 {
            format!("{choice} matches {overlap} of my expertise keyword(s)")
        } else {
            format!("no option matches my expertise; defaulting to {choice}")
        };
        Ok(Vote::new(self.id.clone(), choice.clone(), rationale))
    }
}
