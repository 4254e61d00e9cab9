// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The framed binary messages spec.md §6 "RPC surface" describes, plus
//! the `getMapping` method spec.md §4.11 references for the dynamic
//! bucket resolver's remote lookups (both travel over the same framed
//! mechanism per that section).

use serde::{Deserialize, Serialize};

use scribe_core::entry::Batch;

/// `code ∈ {Ok=0, TryLater=2}` (spec.md §6). The discriminants match the
/// original's wire values; `Fatal` never crosses the wire — a transport
/// failure is the absence of a reply, not a reply value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum LogCode {
    Ok = 0,
    TryLater = 2,
}

/// One `bucket_id -> host:port` pairing, as returned by `getMapping`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketMapping {
    pub bucket_id: u32,
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RpcRequest {
    Log(Batch),
    GetMapping { category: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RpcResponse {
    Log(LogCode),
    /// `None` when the server has no mapping provider configured for this
    /// method — spec.md does not specify this as a core responsibility,
    /// so a server that isn't also a bucket-mapping authority says so
    /// rather than pretending an empty mapping is authoritative.
    Mapping(Option<Vec<BucketMapping>>),
}

pub fn encode_request(req: &RpcRequest) -> Result<Vec<u8>, bincode::Error> {
    bincode::serialize(req)
}

pub fn decode_request(bytes: &[u8]) -> Result<RpcRequest, bincode::Error> {
    bincode::deserialize(bytes)
}

pub fn encode_response(resp: &RpcResponse) -> Result<Vec<u8>, bincode::Error> {
    bincode::serialize(resp)
}

pub fn decode_response(bytes: &[u8]) -> Result<RpcResponse, bincode::Error> {
    bincode::deserialize(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use scribe_core::entry::LogEntry;

    #[test]
    fn request_roundtrips_through_encode_decode() {
        let batch = vec![LogEntry::new("cat", "hello")];
        let req = RpcRequest::Log(batch.clone());
        let bytes = encode_request(&req).unwrap();
        match decode_request(&bytes).unwrap() {
            RpcRequest::Log(decoded) => assert_eq!(decoded, batch),
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn response_roundtrips_through_encode_decode() {
        let resp = RpcResponse::Mapping(Some(vec![BucketMapping {
            bucket_id: 3,
            host: "h".into(),
            port: 9,
        }]));
        let bytes = encode_response(&resp).unwrap();
        match decode_response(&bytes).unwrap() {
            RpcResponse::Mapping(Some(mappings)) => assert_eq!(mappings.len(), 1),
            _ => panic!("wrong variant"),
        }
    }
}
