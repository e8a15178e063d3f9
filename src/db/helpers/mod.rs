use anyhow::{Context, Result};
use uuid::Uuid;

const EPISODE_ID_SEPARATOR: char = ',';

/// Serialize episode ids into the `episode_ids` column, preserving order.
pub fn join_episode_ids(ids: &[Uuid]) -> String {
    ids.iter()
        .map(Uuid::to_string)
        .collect::<Vec<_>>()
        .join(&EPISODE_ID_SEPARATOR.to_string())
}

/// Inverse of [`join_episode_ids`]. An empty column is an empty list.
pub fn split_episode_ids(value: &str) -> Result<Vec<Uuid>> {
    value
        .split(EPISODE_ID_SEPARATOR)
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| parse_uuid(part, "episode_ids"))
        .collect()
}

pub fn parse_uuid(value: &str, field: &str) -> Result<Uuid> {
    Uuid::parse_str(value).with_context(|| format!("failed to parse {field} '{value}'"))
}

/// Wrap a decode failure so it can be returned from a rusqlite row mapper.
pub fn invalid_column(err: anyhow::Error) -> rusqlite::Error {
    rusqlite::Error::ToSqlConversionFailure(Box::new(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        err.to_string(),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn episode_ids_round_trip_in_order() {
        let ids: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
        let joined = join_episode_ids(&ids);
        assert_eq!(joined.matches(',').count(), 3);
        assert_eq!(split_episode_ids(&joined).unwrap(), ids);
    }

    #[test]
    fn empty_list_round_trips() {
        assert_eq!(join_episode_ids(&[]), "");
        assert!(split_episode_ids("").unwrap().is_empty());
    }

    #[test]
    fn garbage_ids_are_rejected() {
        let err = split_episode_ids("not-a-uuid").unwrap_err();
        assert!(err.to_string().contains("episode_ids"));
    }
}
