use tracing::{debug, info, instrument};

use crate::book::LoanBook;
use crate::errors::{LoanError, Result};
use crate::events::Event;
use crate::state::{Client, ClientDetails};
use crate::store::LoanStore;
use crate::types::{ClientId, EntityKind, Page};

fn validate(details: &ClientDetails) -> Result<ClientDetails> {
    let details = details.normalized();
    if details.name.is_empty() {
        return Err(LoanError::InvalidClient {
            message: "name is required".to_string(),
        });
    }
    if details.tax_id.is_empty() {
        return Err(LoanError::InvalidClient {
            message: "tax id is required".to_string(),
        });
    }
    Ok(details)
}

fn matches_term(client: &Client, needle: &str) -> bool {
    needle.is_empty()
        || client.name.to_lowercase().contains(needle)
        || client.tax_id.to_lowercase().contains(needle)
}

impl<S: LoanStore> LoanBook<S> {
    #[instrument(skip(self, details))]
    pub fn create_client(&mut self, details: ClientDetails) -> Result<Client> {
        let details = validate(&details)?;
        if self.store.find_client_by_tax_id(&details.tax_id)?.is_some() {
            return Err(LoanError::DuplicateTaxId { tax_id: details.tax_id });
        }

        let now = self.now();
        let client = self.in_transaction("create_client", |store| store.insert_client(details, now))?;

        info!(client_id = client.id, "client registered");
        self.events.emit(Event::ClientRegistered {
            client_id: client.id,
            name: client.name.clone(),
            timestamp: now,
        });
        Ok(client)
    }

    #[instrument(skip(self, details), fields(client_id = id))]
    pub fn update_client(&mut self, id: ClientId, details: ClientDetails) -> Result<Client> {
        let details = validate(&details)?;
        let mut client = self.client(id)?;

        if let Some(other) = self.store.find_client_by_tax_id(&details.tax_id)? {
            if other.id != id {
                return Err(LoanError::DuplicateTaxId { tax_id: details.tax_id });
            }
        }

        let now = self.now();
        client.name = details.name;
        client.tax_id = details.tax_id;
        client.phone = details.phone;
        client.email = details.email;
        client.address = details.address;
        client.updated_at = now;

        let client = self.in_transaction("update_client", |store| {
            store.update_client(&client)?;
            Ok(client)
        })?;

        info!("client updated");
        self.events.emit(Event::ClientUpdated {
            client_id: id,
            timestamp: now,
        });
        Ok(client)
    }

    /// remove a client that owns no loans
    #[instrument(skip(self), fields(client_id = id))]
    pub fn delete_client(&mut self, id: ClientId) -> Result<()> {
        self.client(id)?;
        let loan_count = self.store.loans_for_client(id)?.len();
        if loan_count > 0 {
            return Err(LoanError::ClientHasLoans {
                client_id: id,
                loan_count,
            });
        }

        self.in_transaction("delete_client", |store| store.delete_client(id))?;

        info!("client removed");
        let now = self.now();
        self.events.emit(Event::ClientRemoved {
            client_id: id,
            timestamp: now,
        });
        Ok(())
    }

    pub fn client(&self, id: ClientId) -> Result<Client> {
        self.store
            .get_client(id)?
            .ok_or_else(|| LoanError::not_found(EntityKind::Client, id))
    }

    /// clients ordered by id
    pub fn clients(&self, page: Page) -> Result<Vec<Client>> {
        Ok(page.apply(self.store.list_clients()?))
    }

    /// Case-insensitive substring search over name and tax id, ordered by
    /// name then id. An empty term matches every client; `None` uses the
    /// configured page size.
    pub fn search_clients(&self, term: &str, page: Option<Page>) -> Result<Vec<Client>> {
        let needle = term.trim().to_lowercase();
        let page = page.unwrap_or_else(|| Page::new(0, self.config.client_page_size));

        let mut found: Vec<Client> = self
            .store
            .list_clients()?
            .into_iter()
            .filter(|c| matches_term(c, &needle))
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));

        debug!(term, matched = found.len(), "client search");
        Ok(page.apply(found))
    }
}
