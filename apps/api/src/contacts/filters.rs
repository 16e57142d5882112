use std::collections::BTreeMap;

use serde::Deserialize;

use crate::listing::{matches_any, search_term, sort_by_created, SortDirection};
use crate::models::contact::{Contact, ContactStatus};

/// Bucket for contacts whose company is missing or blank.
pub const NO_COMPANY: &str = "No Company";

/// `GET /api/contacts?status=replied&search=grace&sort=asc&groupByCompany=true`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactListQuery {
    pub status: Option<ContactStatus>,
    pub search: Option<String>,
    #[serde(default)]
    pub sort: SortDirection,
    #[serde(default)]
    pub group_by_company: bool,
}

/// Search covers name, company, role, email and notes.
pub fn filter_contacts(mut contacts: Vec<Contact>, query: &ContactListQuery) -> Vec<Contact> {
    if let Some(status) = query.status {
        contacts.retain(|c| c.status == status);
    }
    if let Some(term) = search_term(query.search.as_deref()) {
        contacts.retain(|c| {
            matches_any(
                &term,
                [
                    Some(c.name.as_str()),
                    c.company.as_deref(),
                    c.role.as_deref(),
                    c.email.as_deref(),
                    c.notes.as_deref(),
                ],
            )
        });
    }
    sort_by_created(&mut contacts, query.sort, |c| c.created_at);
    contacts
}

/// Buckets contacts by company name, keeping each bucket in the incoming order.
pub fn group_by_company(contacts: &[Contact]) -> BTreeMap<String, Vec<Contact>> {
    let mut groups: BTreeMap<String, Vec<Contact>> = BTreeMap::new();
    for contact in contacts {
        let company = contact
            .company
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(NO_COMPANY);
        groups
            .entry(company.to_string())
            .or_default()
            .push(contact.clone());
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    fn contact(name: &str, company: Option<&str>, status: ContactStatus, age_days: i64) -> Contact {
        let created = Utc::now() - Duration::days(age_days);
        Contact {
            id: Uuid::new_v4(),
            user_id: "user-a".into(),
            name: name.into(),
            company: company.map(str::to_string),
            role: None,
            link: None,
            email: Some(format!("{}@example.com", name.to_lowercase())),
            notes: None,
            status,
            last_contacted_at: None,
            created_at: created,
            updated_at: created,
        }
    }

    fn names(contacts: &[Contact]) -> Vec<&str> {
        contacts.iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn test_group_by_company_uses_no_company_bucket() {
        let contacts = vec![
            contact("Ada", Some("Acme"), ContactStatus::NotContacted, 1),
            contact("Grace", None, ContactStatus::NotContacted, 2),
            contact("Linus", Some("  "), ContactStatus::NotContacted, 3),
            contact("Ken", Some("Acme"), ContactStatus::NotContacted, 4),
        ];
        let groups = group_by_company(&contacts);
        assert_eq!(groups.len(), 2);
        assert_eq!(names(&groups["Acme"]), ["Ada", "Ken"]);
        assert_eq!(names(&groups[NO_COMPANY]), ["Grace", "Linus"]);
    }

    #[test]
    fn test_filter_by_status_and_search_email() {
        let contacts = vec![
            contact("Ada", Some("Acme"), ContactStatus::Replied, 1),
            contact("Grace", None, ContactStatus::Replied, 2),
            contact("Ken", Some("Bell"), ContactStatus::NotContacted, 3),
        ];
        let query = ContactListQuery {
            status: Some(ContactStatus::Replied),
            sort: SortDirection::Asc,
            ..Default::default()
        };
        assert_eq!(names(&filter_contacts(contacts.clone(), &query)), ["Grace", "Ada"]);

        let query = ContactListQuery {
            search: Some("KEN@".into()),
            ..Default::default()
        };
        assert_eq!(names(&filter_contacts(contacts, &query)), ["Ken"]);
    }

    #[test]
    fn test_query_parses_camel_case_flag() {
        let query: ContactListQuery =
            serde_json::from_str(r#"{"groupByCompany": true, "sort": "asc"}"#).unwrap();
        assert!(query.group_by_company);
        assert_eq!(query.sort, SortDirection::Asc);
    }
}
