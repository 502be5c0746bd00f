pub mod file;
pub mod memory;

use crate::StateRecord;

// Decodes a stored record, reporting unparseable fields without failing.
pub(crate) fn decode_record(text: &str) -> StateRecord {
    let (record, errors) = StateRecord::decode(text);
    for error in errors {
        log::warn!("ignoring malformed state field, {error}");
    }
    record
}
