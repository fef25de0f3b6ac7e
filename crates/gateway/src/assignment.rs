//! Decoder for consumer-protocol member assignments.
//!
//! Layout (all versions): `version: i16`, then an array of
//! `(topic: string, partitions: [i32])`, then opaque user data which is ignored.
//! Arrays and strings are length-prefixed big-endian (`i32` / `i16`).

use crate::gateway::TopicPartition;
use bytes::Buf;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AssignmentError {
    #[error("assignment truncated while reading {0}")]
    Truncated(&'static str),

    #[error("negative length for {0}")]
    NegativeLength(&'static str),

    #[error("topic name is not valid UTF-8")]
    InvalidTopic,
}

fn read_i16(buf: &mut &[u8], what: &'static str) -> Result<i16, AssignmentError> {
    if buf.remaining() < 2 {
        return Err(AssignmentError::Truncated(what));
    }
    Ok(buf.get_i16())
}

fn read_i32(buf: &mut &[u8], what: &'static str) -> Result<i32, AssignmentError> {
    if buf.remaining() < 4 {
        return Err(AssignmentError::Truncated(what));
    }
    Ok(buf.get_i32())
}

fn read_len(buf: &mut &[u8], what: &'static str) -> Result<usize, AssignmentError> {
    let len = read_i32(buf, what)?;
    usize::try_from(len).map_err(|_| AssignmentError::NegativeLength(what))
}

fn read_string(buf: &mut &[u8]) -> Result<String, AssignmentError> {
    let len = read_i16(buf, "topic length")?;
    let len = usize::try_from(len).map_err(|_| AssignmentError::NegativeLength("topic"))?;
    if buf.remaining() < len {
        return Err(AssignmentError::Truncated("topic"));
    }
    let name = std::str::from_utf8(&buf[..len])
        .map_err(|_| AssignmentError::InvalidTopic)?
        .to_string();
    buf.advance(len);
    Ok(name)
}

/// Decodes the partitions assigned to a member.
///
/// Members that have not been assigned yet carry an empty payload.
pub fn parse_assignment(raw: &[u8]) -> Result<Vec<TopicPartition>, AssignmentError> {
    if raw.is_empty() {
        return Ok(Vec::new());
    }

    let mut buf = raw;
    let _version = read_i16(&mut buf, "version")?;

    let topics = read_len(&mut buf, "topic count")?;
    let mut assigned = Vec::new();
    for _ in 0..topics {
        let topic = read_string(&mut buf)?;
        let partitions = read_len(&mut buf, "partition count")?;
        for _ in 0..partitions {
            let partition = read_i32(&mut buf, "partition")?;
            assigned.push(TopicPartition::new(topic.clone(), partition));
        }
    }
    Ok(assigned)
}
