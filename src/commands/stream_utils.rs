use crate::{
    commands::command_error::CommandError,
    key_value_store::{StreamEntry, StreamEntryId},
    resp::RespValue,
};

/// Parses an entry id of the form `ms` or `ms-seq`. A missing sequence part
/// takes `default_seq`, which differs between range starts and range ends.
pub fn parse_entry_id(raw: &str, default_seq: u64) -> Result<StreamEntryId, CommandError> {
    let invalid =
        || CommandError::InvalidStreamId("Invalid stream ID specified as stream command argument".to_string());

    let (ms_part, seq_part) = match raw.split_once('-') {
        Some((ms, seq)) => (ms, Some(seq)),
        None => (raw, None),
    };

    let ms = ms_part.parse::<u64>().map_err(|_| invalid())?;
    let seq = match seq_part {
        Some(seq) => seq.parse::<u64>().map_err(|_| invalid())?,
        None => default_seq,
    };

    Ok(StreamEntryId::new(ms, seq))
}

/// Encodes entries as the nested reply shape shared by XRANGE and XREAD:
/// each entry is `[id, [field, value, field, value, ...]]`.
pub fn entries_to_resp(entries: &[&StreamEntry]) -> RespValue {
    RespValue::Array(
        entries
            .iter()
            .map(|entry| {
                let mut flat_fields = Vec::with_capacity(entry.fields.len() * 2);
                for (field, value) in &entry.fields {
                    flat_fields.push(RespValue::BulkString(field.clone()));
                    flat_fields.push(RespValue::BulkString(value.clone()));
                }

                RespValue::Array(vec![
                    RespValue::BulkString(entry.id.to_string()),
                    RespValue::Array(flat_fields),
                ])
            })
            .collect(),
    )
}
