//! # TM Server
//!
//! Publishes one telemetry snapshot per cycle into a shared cache, which the
//! network peers read from when they request telemetry.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    net::SocketAddr,
    sync::{Arc, Mutex},
};

use comms_if::{
    net::{LineServer, NetError, NetParams, Responder},
    tm::ArmTm,
};

use crate::data_store::DataStore;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The latest telemetry snapshot, shared between the control loop and the peer threads.
#[derive(Debug, Default)]
pub struct TmCache {
    snapshot: Mutex<ArmTm>,
}

/// Builds the snapshot for each cycle and stores it in the cache.
#[derive(Debug)]
pub struct TmPublisher {
    cache: Arc<TmCache>,

    /// Sequence number of the last published snapshot.
    seq: u64,
}

/// Telemetry server
pub struct TmServer {
    publisher: TmPublisher,

    server: LineServer,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum TmServerError {
    #[error("Network error: {0}")]
    NetError(NetError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl TmCache {
    /// Replace the stored snapshot.
    pub fn store(&self, tm: ArmTm) {
        // A poisoned lock still holds a complete snapshot, since it is only ever replaced whole
        let mut guard = self.snapshot.lock().unwrap_or_else(|e| e.into_inner());
        *guard = tm;
    }

    /// Copy of the stored snapshot.
    pub fn snapshot(&self) -> ArmTm {
        *self.snapshot.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Responder for TmCache {
    fn respond(&self) -> String {
        self.snapshot().to_record()
    }
}

impl TmPublisher {
    pub fn new(cache: Arc<TmCache>) -> Self {
        Self { cache, seq: 0 }
    }

    /// Publish the snapshot for this cycle, returning it.
    ///
    /// The sequence number increases by one on every call, whether or not the arm moved.
    pub fn publish(&mut self, ds: &DataStore) -> ArmTm {
        self.seq += 1;

        let tm = ArmTm {
            seq: self.seq,
            ts_s: ds.session_time_s,
            target_deg: ds.arm_ctrl.joints().cmd_deg(),
            current_deg: ds.measured_deg,
            jaw: ds.jaw_aperture,
        }
        .sanitised();

        self.cache.store(tm);

        tm
    }
}

impl TmServer {
    /// Create a new instance of the TM Server, bound to the telemetry endpoint.
    ///
    /// This function will not block waiting for peers.
    pub fn new(params: &NetParams) -> Result<Self, TmServerError> {
        let cache = Arc::new(TmCache::default());

        let server = LineServer::new(params, cache.clone()).map_err(TmServerError::NetError)?;

        Ok(Self {
            publisher: TmPublisher::new(cache),
            server,
        })
    }

    /// Publish this cycle's telemetry.
    pub fn send(&mut self, ds: &DataStore) -> ArmTm {
        self.publisher.publish(ds)
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.server.local_addr()
    }

    /// Number of currently connected peers.
    pub fn num_peers(&self) -> usize {
        self.server.num_peers()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::{BufRead, BufReader, Write};

    #[test]
    fn test_seq_increments_once_per_publish() {
        let cache = Arc::new(TmCache::default());
        let mut publisher = TmPublisher::new(cache.clone());
        let mut ds = DataStore::default();

        let mut prev = cache.snapshot().seq;
        assert_eq!(prev, 0);

        for i in 0..10 {
            // Skipped and active cycles alike
            ds.measured_deg[0] = i as f64;
            let tm = publisher.publish(&ds);

            assert_eq!(tm.seq, prev + 1);
            assert_eq!(cache.snapshot(), tm);
            prev = tm.seq;
        }
    }

    #[test]
    fn test_snapshot_is_sanitised() {
        let cache = Arc::new(TmCache::default());
        let mut publisher = TmPublisher::new(cache.clone());
        let mut ds = DataStore::default();
        ds.measured_deg[3] = f64::NAN;
        ds.session_time_s = f64::INFINITY;

        let tm = publisher.publish(&ds);
        assert_eq!(tm.current_deg[3], 0.0);
        assert_eq!(tm.ts_s, 0.0);
    }

    #[test]
    fn test_server_serves_latest_snapshot() {
        let params = NetParams {
            tm_endpoint: "127.0.0.1:0".into(),
            ..Default::default()
        };
        let mut server = TmServer::new(&params).unwrap();

        let mut ds = DataStore::default();
        ds.jaw_aperture = 1234;
        server.send(&ds);
        server.send(&ds);

        let stream = comms_if::net::connect(&server.local_addr().to_string()).unwrap();
        let mut writer = stream.try_clone().unwrap();
        let mut reader = BufReader::new(stream);

        writer.write_all(b"get\n").unwrap();
        let mut line = String::new();
        reader.read_line(&mut line).unwrap();

        let tm = ArmTm::from_record(&line).unwrap();
        assert_eq!(tm.seq, 2);
        assert_eq!(tm.jaw, 1234);
    }
}
