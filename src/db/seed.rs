//! First-run example content.

use super::ContentStore;
use crate::errors::AppError;
use crate::models::ContentDraft;

/// (title, slug, category, html)
const SEED_CONTENT: &[(&str, &str, &str, &str)] = &[
    (
        "Dashboard Overview",
        "dashboard-overview",
        "Dashboard",
        include_str!("seed/dashboard-overview.html"),
    ),
    (
        "Lead-to-Cash (L2C) Process in Telecom",
        "bss-lead-to-cash",
        "BSS",
        include_str!("seed/bss-lead-to-cash.html"),
    ),
    (
        "Mobile Technologies (3G/4G/5G)",
        "mobile-technologies",
        "Mobile Tech",
        include_str!("seed/mobile-technologies.html"),
    ),
    (
        "Network Fulfillment & Intelligent Networks (IN)",
        "network-fulfillment",
        "Network",
        include_str!("seed/network-fulfillment.html"),
    ),
];

/// The example records inserted into an empty store.
pub fn seed_drafts() -> Vec<ContentDraft> {
    SEED_CONTENT
        .iter()
        .map(|(title, slug, category, html)| ContentDraft::new(title, slug, category, html))
        .collect()
}

/// Insert the example records if the store holds nothing yet.
///
/// Returns the number of records inserted.
pub async fn seed_if_empty(store: &ContentStore) -> Result<usize, AppError> {
    let existing = store.count().await;
    if existing > 0 {
        tracing::debug!("Store holds {} record(s); skipping seed", existing);
        return Ok(0);
    }

    tracing::info!("Content store is empty. Seeding initial content...");
    let mut inserted = 0;
    for draft in seed_drafts() {
        store.insert(draft).await?;
        inserted += 1;
    }
    tracing::info!("Seeded {} initial content items", inserted);
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::StoreOptions;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_seed_runs_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("content.db");

        let store = ContentStore::open(&path, StoreOptions::default())
            .await
            .unwrap();
        assert_eq!(seed_if_empty(&store).await.unwrap(), SEED_CONTENT.len());
        assert_eq!(seed_if_empty(&store).await.unwrap(), 0);
        drop(store);

        let store = ContentStore::open(&path, StoreOptions::default())
            .await
            .unwrap();
        assert_eq!(seed_if_empty(&store).await.unwrap(), 0);
        assert_eq!(store.count().await, SEED_CONTENT.len());
        assert!(store.find_by_slug("bss-lead-to-cash").await.is_some());
    }

    #[test]
    fn test_seed_drafts_are_valid() {
        for draft in seed_drafts() {
            assert!(!draft.title.is_empty());
            assert!(!draft.html_content.trim().is_empty());
            assert!(draft
                .slug
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-'));
        }
    }
}
