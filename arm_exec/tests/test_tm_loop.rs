//! # Telemetry loop integration tests
//!
//! Runs the exec's control and telemetry path for a few cycles with a peer connected.

use std::io::{BufRead, BufReader, Write};

use arm_lib::{
    arm_ctrl::{ArmCtrl, Params},
    data_store::DataStore,
    kinematics::Pose,
    pose_source::ManualTarget,
    tm_server::TmServer,
};
use comms_if::{net::NetParams, tm::ArmTm};

#[test]
fn test_peer_sees_every_cycle() {
    let params: Params =
        util::params::from_str(include_str!("../../params/arm_ctrl.toml")).unwrap();

    let mut ds = DataStore::default();
    ds.arm_ctrl = ArmCtrl::new(params, &[0.0, 20.0, -30.0, 0.0, 30.0, 0.0]).unwrap();
    ds.manual_target = ManualTarget::new(Pose::from_position_rpy([0.35, 0.05, 0.3], [0.0; 3]));

    let mut server = TmServer::new(&NetParams {
        tm_endpoint: "127.0.0.1:0".into(),
        ..Default::default()
    })
    .unwrap();

    let stream = comms_if::net::connect(&server.local_addr().to_string()).unwrap();
    let mut writer = stream.try_clone().unwrap();
    let mut reader = BufReader::new(stream);

    let mut last_seq = 0;
    for _ in 0..20 {
        ds.cycle_start(50.0);
        let (dems, report) = ds.arm_ctrl.advance(0.02, &ds.manual_target, None).unwrap();
        ds.arm_ctrl_output = dems;
        ds.arm_ctrl_status_rpt = report;
        let published = server.send(&ds);
        ds.cycle_end();

        writer.write_all(b"get\n").unwrap();
        let mut line = String::new();
        reader.read_line(&mut line).unwrap();
        let tm = ArmTm::from_record(&line).unwrap();

        assert_eq!(tm.seq, last_seq + 1);
        assert_eq!(tm.seq, published.seq);
        for (a, b) in tm.target_deg.iter().zip(dems.pos_deg.iter()) {
            assert!((a - b).abs() < 1e-4);
        }
        last_seq = tm.seq;
    }

    // Unknown requests are ignored, the next valid one is still answered
    writer.write_all(b"status\nget\n").unwrap();
    let mut line = String::new();
    reader.read_line(&mut line).unwrap();
    assert_eq!(ArmTm::from_record(&line).unwrap().seq, last_seq);
}
