use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

use crate::error::Result;
use crate::route::Route;

/// Route history of wizard sessions, keyed by session id.
#[async_trait]
pub trait RouteHistory: Send + Sync {
    /// Add a new entry.
    async fn push(&self, session_id: &str, route: Route) -> Result<()>;
    /// Overwrite the newest entry, or add one if the history is empty.
    async fn replace(&self, session_id: &str, route: Route) -> Result<()>;
    async fn current(&self, session_id: &str) -> Result<Option<Route>>;
    async fn len(&self, session_id: &str) -> Result<usize>;
    async fn delete(&self, session_id: &str) -> Result<()>;
}

#[derive(Default)]
pub struct InMemoryRouteHistory {
    entries: Arc<DashMap<String, Vec<Route>>>,
}

impl InMemoryRouteHistory {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
        }
    }
}

#[async_trait]
impl RouteHistory for InMemoryRouteHistory {
    async fn push(&self, session_id: &str, route: Route) -> Result<()> {
        self.entries
            .entry(session_id.to_string())
            .or_default()
            .push(route);
        Ok(())
    }

    async fn replace(&self, session_id: &str, route: Route) -> Result<()> {
        let mut entries = self.entries.entry(session_id.to_string()).or_default();
        match entries.last_mut() {
            Some(last) => *last = route,
            None => entries.push(route),
        }
        Ok(())
    }

    async fn current(&self, session_id: &str) -> Result<Option<Route>> {
        Ok(self
            .entries
            .get(session_id)
            .and_then(|entries| entries.last().cloned()))
    }

    async fn len(&self, session_id: &str) -> Result<usize> {
        Ok(self.entries.get(session_id).map_or(0, |entries| entries.len()))
    }

    async fn delete(&self, session_id: &str) -> Result<()> {
        self.entries.remove(session_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::WizardStep;

    #[tokio::test]
    async fn replace_overwrites_newest_entry() {
        let history = InMemoryRouteHistory::new();
        history.push("s1", Route::ClaimsList).await.unwrap();
        history
            .push("s1", Route::wizard(None, Some(WizardStep::Create)))
            .await
            .unwrap();
        history
            .replace("s1", Route::wizard(Some("abc"), Some(WizardStep::Documents)))
            .await
            .unwrap();

        assert_eq!(history.len("s1").await.unwrap(), 2);
        assert_eq!(
            history.current("s1").await.unwrap(),
            Some(Route::wizard(Some("abc"), Some(WizardStep::Documents)))
        );
    }

    #[tokio::test]
    async fn replace_on_empty_history_adds_entry() {
        let history = InMemoryRouteHistory::new();
        history.replace("s1", Route::ClaimsList).await.unwrap();
        assert_eq!(history.len("s1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn sessions_are_isolated() {
        let history = InMemoryRouteHistory::new();
        history.push("s1", Route::ClaimsList).await.unwrap();
        assert_eq!(history.current("s2").await.unwrap(), None);

        history.delete("s1").await.unwrap();
        assert_eq!(history.len("s1").await.unwrap(), 0);
    }
}
