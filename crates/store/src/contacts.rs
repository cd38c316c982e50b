//! Contact list: `/sms/contacts.txt`, one `name<TAB>phone` per line.

use heapless::{String, Vec};
use platform::config::SMS_ROOT;
use platform::Storage;

use crate::fs::{ensure_dir, for_each_line, write_lines, MAX_LINE};
use crate::paths::CONTACTS;
use crate::sms::{normalize_phone, Phone};
use crate::StoreError;

/// Contacts kept.
pub const MAX_CONTACTS: usize = 32;

/// Longest display name.
pub const MAX_CONTACT_NAME: usize = 24;

/// One address-book entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    /// Display name.
    pub name: String<MAX_CONTACT_NAME>,
    /// Normalized phone number.
    pub phone: Phone,
}

/// In-memory contact list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Contacts {
    entries: Vec<Contact, MAX_CONTACTS>,
}

impl Contacts {
    /// Read the list from the card; a missing file is an empty list.
    pub async fn load<S: Storage>(sd: &mut S) -> Result<Self, StoreError> {
        let mut list = Self::default();
        for_each_line(sd, CONTACTS, |line| {
            if let Some((name, phone)) = line.split_once('\t') {
                let _ = list.upsert(name, phone);
            }
            true
        })
        .await?;
        Ok(list)
    }

    /// Write the list back.
    pub async fn save<S: Storage>(&self, sd: &mut S) -> Result<(), StoreError> {
        ensure_dir(sd, SMS_ROOT).await?;
        let mut lines: Vec<String<MAX_LINE>, MAX_CONTACTS> = Vec::new();
        for c in &self.entries {
            let mut line = String::new();
            let _ = line.push_str(&c.name);
            let _ = line.push('\t');
            let _ = line.push_str(&c.phone);
            let _ = lines.push(line);
        }
        write_lines(sd, CONTACTS, lines.iter().map(|l| l.as_str())).await
    }

    /// Add a contact or rename the one with the same number.
    pub fn upsert(&mut self, name: &str, phone: &str) -> Result<(), StoreError> {
        let phone = normalize_phone(phone);
        let name = name.trim();
        if phone.is_empty() || name.is_empty() {
            return Err(StoreError::InvalidName);
        }
        let mut short = String::new();
        for c in name.chars() {
            if short.push(c).is_err() {
                break;
            }
        }
        if let Some(existing) = self.entries.iter_mut().find(|c| c.phone == phone) {
            existing.name = short;
            return Ok(());
        }
        self.entries
            .push(Contact { name: short, phone })
            .map_err(|_| StoreError::Full)
    }

    /// Remove the contact at `index`, keeping the order of the rest.
    pub fn remove(&mut self, index: usize) -> Option<Contact> {
        (index < self.entries.len()).then(|| self.entries.remove(index))
    }

    /// Name for a phone number, matched after normalization.
    pub fn name_for(&self, phone: &str) -> Option<&str> {
        let phone = normalize_phone(phone);
        self.entries
            .iter()
            .find(|c| c.phone == phone)
            .map(|c| c.name.as_str())
    }

    /// All contacts in file order.
    pub fn entries(&self) -> &[Contact] {
        &self.entries
    }

    /// Number of contacts.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use platform::mocks::MemStorage;

    #[tokio::test]
    async fn test_round_trip() {
        let fs = MemStorage::new();
        let mut sd = fs.clone();
        let mut list = Contacts::load(&mut sd).await.unwrap();
        assert!(list.is_empty());
        list.upsert("Alice", "+1 (234) 567").unwrap();
        list.upsert("Bob", "555-0100").unwrap();
        list.save(&mut sd).await.unwrap();
        assert_eq!(
            fs.get_string("/sms/contacts.txt").unwrap(),
            "Alice\t+1234567\nBob\t5550100\n"
        );
        let again = Contacts::load(&mut sd).await.unwrap();
        assert_eq!(again, list);
        assert_eq!(again.name_for("+1-234-567"), Some("Alice"));
    }

    #[test]
    fn test_upsert_same_number_renames() {
        let mut list = Contacts::default();
        list.upsert("Al", "+1234").unwrap();
        list.upsert("Alice", "+1234").unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list.name_for("+1234"), Some("Alice"));
    }

    #[test]
    fn test_capacity() {
        let mut list = Contacts::default();
        for i in 0..MAX_CONTACTS {
            list.upsert("x", &format!("{i}")).unwrap();
        }
        assert_eq!(list.upsert("y", "999999"), Err(StoreError::Full));
        assert!(list.remove(0).is_some());
        assert!(list.remove(99).is_none());
    }
}
