use crate::config::Config;
use crate::questions::{self, QueryItem, QuestionSet};
use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

#[derive(Args, Clone, Default, Debug)]
pub struct CommonParams {
    /// Use this configuration file instead of the personal one
    #[arg(short = 'c', long = "config", help = "Path to an alternate configuration file")]
    pub config_path: Option<PathBuf>,

    /// Override the Gemini model for this run
    #[arg(long, help = "Override the Gemini model")]
    pub model: Option<String>,

    /// TOML file of `[[questions]]` entries
    #[arg(long, help = "Load questions and tags from a TOML file")]
    pub questions: Option<PathBuf>,

    /// Built-in question set
    #[arg(long, value_enum, help = "Select a built-in question set")]
    pub question_set: Option<QuestionSet>,
}

impl CommonParams {
    /// Load the selected configuration and apply the overrides to it
    pub fn load_config(&self) -> Result<Config> {
        let mut config = match &self.config_path {
            Some(path) => Config::load_from(path)?,
            None => Config::load()?,
        };
        self.apply_to_config(&mut config);
        Ok(config)
    }

    pub fn apply_to_config(&self, config: &mut Config) -> bool {
        let mut changes_made = false;

        if let Some(model) = &self.model
            && config.gemini.model != *model
        {
            config.gemini.model.clone_from(model);
            changes_made = true;
        }

        // An explicit set on the command line wins over configured questions
        if let Some(set) = self.question_set {
            config.question_set = set;
            config.questions.clear();
            changes_made = true;
        }

        changes_made
    }

    /// Questions for this invocation, validated
    pub fn resolve_questions(&self, config: &Config) -> Result<Vec<QueryItem>> {
        let items = match &self.questions {
            Some(path) => questions::load_questions(path)?,
            None => config.effective_questions(),
        };
        questions::validate(&items)?;
        Ok(items)
    }
}
