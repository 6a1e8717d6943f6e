use bson::{doc, Document};
use uuid::Uuid;

// Ids and timestamps are stored in their serde string forms, so filters
// compare against hyphenated UUID strings.

#[inline]
pub fn by_id(id: Uuid) -> Document {
    doc! { "_id": id.to_string() }
}

#[inline]
pub fn by_uuid_field(field: &str, id: Uuid) -> Document {
    doc! { field: id.to_string() }
}

#[inline]
pub fn by_email(email: impl AsRef<str>) -> Document {
    doc! { "email": email.as_ref() }
}

#[inline]
pub fn id_strings(ids: &[Uuid]) -> Vec<String> {
    ids.iter().map(Uuid::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_filter_uses_hyphenated_string() {
        let id = Uuid::new_v4();
        let f = by_id(id);
        assert_eq!(f.get_str("_id").unwrap(), id.to_string());
    }
}
