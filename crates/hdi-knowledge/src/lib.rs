//! Reference data and persistence layer for ChatHDI
//!
//! This crate provides:
//! - The R&D reference dataset (papers, equipment, materials, institutions)
//! - Conversation persistence behind a store trait, JSON file or in-memory

pub mod conversations;
pub mod reference;

// Re-export main types
pub use conversations::{
    ConversationRecord, ConversationStore, JsonFileStore, MemoryStore, StoreError,
};
pub use reference::{
    Categories, Institution, LabEquipment, Material, ReferenceData, ResearchPaper,
};

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use hdi_core::ChatMessage;

    #[tokio::test]
    async fn test_basic_integration() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = JsonFileStore::open(dir.path().join("conversations.json")).await?;

        let data = ReferenceData::builtin()?;
        let paper = &data.papers[0];
        let record = ConversationRecord::new(
            paper.title.clone(),
            vec![ChatMessage::user(format!("Ringkas makalah {}", paper.id))],
        );
        let saved = store.save(record).await?;

        let all = store.load().await?;
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, saved.id);
        assert_eq!(all[0].title, paper.title);
        Ok(())
    }
}
