use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Paths {
    pub base: PathBuf,
}

impl Paths {
    pub fn new() -> Self {
        let base = dirs::home_dir()
            .map(|h| h.join(".orbit"))
            .unwrap_or_else(|| PathBuf::from(".orbit"));
        Self { base }
    }

    pub fn with_base(base: PathBuf) -> Self {
        Self { base }
    }

    pub fn config_file(&self) -> PathBuf {
        self.base.join("config.json")
    }

    pub fn conversations_dir(&self) -> PathBuf {
        self.base.join("conversations")
    }

    pub fn conversation_file(&self, conversation_id: &str) -> PathBuf {
        let safe_id = conversation_id.replace([':', '/', '\\'], "_");
        self.conversations_dir().join(format!("{}.jsonl", safe_id))
    }

    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.base)?;
        std::fs::create_dir_all(self.conversations_dir())?;
        Ok(())
    }
}

impl Default for Paths {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversation_file_sanitizes_id() {
        let paths = Paths::with_base(PathBuf::from("/tmp/orbit-test"));
        let file = paths.conversation_file("telegram:42/main");
        assert_eq!(
            file,
            PathBuf::from("/tmp/orbit-test/conversations/telegram_42_main.jsonl")
        );
    }
}
