use parking_lot::Mutex;
use reqwest::Url;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum EndpointStatus {
    Online,
    Offline,
}

impl EndpointStatus {
    const fn is_offline(self) -> bool {
        matches!(self, Self::Offline)
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Endpoint {
    index: usize,
    url: Url,
}

impl Endpoint {
    pub const fn url(&self) -> &Url {
        &self.url
    }

    pub const fn is_fallback(&self) -> bool {
        self.index > 0
    }
}

/// Beacon node endpoints in order of preference.
///
/// Calls run concurrently, so each call walks the list on its own.
/// Only the last observed status of every endpoint is shared.
pub struct Endpoints {
    endpoints: Vec<Endpoint>,
    statuses: Mutex<Vec<EndpointStatus>>,
}

impl Endpoints {
    pub fn new(urls: impl IntoIterator<Item = Url>) -> Self {
        let endpoints = urls
            .into_iter()
            .enumerate()
            .map(|(index, url)| Endpoint { index, url })
            .collect::<Vec<_>>();

        let statuses = Mutex::new(vec![EndpointStatus::Online; endpoints.len()]);

        Self {
            endpoints,
            statuses,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Endpoint> {
        self.endpoints.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn all_offline(&self) -> bool {
        self.statuses
            .lock()
            .iter()
            .all(|status| status.is_offline())
    }

    pub fn status(&self, endpoint: &Endpoint) -> Option<EndpointStatus> {
        self.statuses.lock().get(endpoint.index).copied()
    }

    pub fn set_status(&self, endpoint: &Endpoint, status: EndpointStatus) {
        if let Some(current) = self.statuses.lock().get_mut(endpoint.index) {
            *current = status;
        }
    }

    pub fn next(&self, endpoint: &Endpoint) -> Option<&Endpoint> {
        self.endpoints.get(endpoint.index.saturating_add(1))
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;

    use super::*;

    #[test]
    fn test_empty_endpoints() {
        let endpoints = Endpoints::new([]);

        assert!(endpoints.is_empty());
        assert!(endpoints.all_offline());
        assert_eq!(endpoints.iter().next(), None);
    }

    #[test]
    fn test_endpoints() -> Result<()> {
        let endpoints = Endpoints::new([
            "https://example1.net".parse()?,
            "https://example2.net".parse()?,
        ]);

        assert!(!endpoints.is_empty());
        assert!(!endpoints.all_offline(), "initially endpoints are online");

        let [primary, fallback] = [0, 1].map(|index| endpoints.endpoints[index].clone());

        assert!(!primary.is_fallback());
        assert!(fallback.is_fallback());
        assert_eq!(primary.url().as_str(), "https://example1.net/");
        assert_eq!(endpoints.next(&primary), Some(&fallback));
        assert_eq!(endpoints.next(&fallback), None);

        endpoints.set_status(&primary, EndpointStatus::Offline);

        assert_eq!(endpoints.status(&primary), Some(EndpointStatus::Offline));
        assert_eq!(endpoints.status(&fallback), Some(EndpointStatus::Online));
        assert!(!endpoints.all_offline());

        endpoints.set_status(&fallback, EndpointStatus::Offline);

        assert!(endpoints.all_offline());

        // Iteration always starts from the preferred endpoint regardless of status.
        assert_eq!(endpoints.iter().next(), Some(&primary));

        Ok(())
    }
}
