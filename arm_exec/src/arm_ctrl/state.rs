//! Implementations for the ArmCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, warn};
use serde::Serialize;

// Internal
use super::{
    dls, integrator, jacobian::sanitise_jacobian, pose_error, ArmCtrlError, JointStore, Params,
    NUM_JOINTS,
};
use crate::{
    kinematics::{Chain, KinematicModel, Pose},
    pose_source::PoseSource,
};
use util::{module::State, params, session::Session};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Arm control module state
pub struct ArmCtrl {
    pub(crate) params: Params,

    pub(crate) model: Box<dyn KinematicModel + Send>,

    pub(crate) joints: JointStore,

    pub(crate) report: StatusReport,
}

/// Initialisation data for ArmCtrl.
#[derive(Debug, Clone, Copy)]
pub struct InitData {
    /// Name of the parameter file, relative to the parameter directory.
    pub params_file: &'static str,

    /// Joint angles of the arm at startup.
    ///
    /// Units: degrees
    pub initial_deg: [f64; NUM_JOINTS],
}

/// Input data to Arm Control.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputData {
    /// Length of this tick.
    ///
    /// Units: seconds
    pub dt_s: f64,

    /// The end-effector target, or `None` if there is no target this tick, in
    /// which case the joints hold.
    pub target: Option<Pose>,

    /// The latest measured joint angles, if any are available.
    ///
    /// Units: degrees
    pub measured_deg: Option<[f64; NUM_JOINTS]>,
}

/// Joint demands output by ArmCtrl.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ArmDems {
    /// Commanded angle of each joint.
    ///
    /// Units: degrees
    pub pos_deg: [f64; NUM_JOINTS],
}

/// Status report for ArmCtrl processing.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StatusReport {
    /// No target was available (or it was unusable) so the tick was skipped.
    pub skipped: bool,

    /// The end effector finished the tick within tolerance of the target.
    pub converged: bool,

    /// Number of solver iterations run this tick.
    pub iterations: usize,

    /// Distance to the target at the end of the tick.
    ///
    /// Units: meters
    pub pos_err_m: f64,

    /// Angle to the target at the end of the tick.
    ///
    /// Units: degrees
    pub rot_err_deg: f64,

    /// A non-finite Jacobian entry was zeroed during the tick.
    pub jacobian_sanitised: bool,

    pub abs_pos_limited: [bool; NUM_JOINTS],
    pub rate_limited: [bool; NUM_JOINTS],
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for ArmCtrl {
    fn default() -> Self {
        Self {
            params: Params::default(),
            model: Box::new(Chain::default()),
            joints: JointStore::default(),
            report: StatusReport::default(),
        }
    }
}

impl State for ArmCtrl {
    type InitData = InitData;
    type InitError = ArmCtrlError;

    type InputData = InputData;
    type OutputData = ArmDems;
    type StatusReport = StatusReport;
    type ProcError = ArmCtrlError;

    /// Initialise the ArmCtrl module.
    ///
    /// Loads the parameters, builds the chain and takes the initial joint
    /// angles as the first commanded angles.
    fn init(&mut self, init_data: Self::InitData, _session: &Session) -> Result<(), Self::InitError> {
        let params: Params =
            params::load(init_data.params_file).map_err(ArmCtrlError::ParamLoadError)?;

        *self = Self::new(params, &init_data.initial_deg)?;

        info!(
            "ArmCtrl initialised from {} with joints at {:?} deg",
            init_data.params_file,
            self.joints.cmd_deg()
        );

        Ok(())
    }

    /// Perform cyclic processing of Arm Control.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        let dt_s = input_data.dt_s;
        if !dt_s.is_finite() || dt_s <= 0.0 {
            return Err(ArmCtrlError::InvalidTickPeriod(dt_s));
        }

        // Clear the status report
        self.report = StatusReport::default();

        if let Some(ref measured) = input_data.measured_deg {
            self.joints.set_measured(measured);
        }

        match input_data.target {
            Some(target) if target.is_finite() => self.solve(&target, dt_s),
            Some(_) => {
                warn!("Target pose is not finite, holding joints");
                self.report.skipped = true;
            }
            None => {
                debug!("No target, holding joints");
                self.report.skipped = true;
            }
        }

        Ok((self.dems(), self.report))
    }
}

impl ArmCtrl {
    /// Create a new controller using the chain described by the parameters.
    pub fn new(params: Params, initial_deg: &[f64; NUM_JOINTS]) -> Result<Self, ArmCtrlError> {
        let chain = Chain::from_params(&params.chain).map_err(ArmCtrlError::ChainError)?;

        Self::with_model(params, Box::new(chain), initial_deg)
    }

    /// Create a new controller around any kinematic model.
    pub fn with_model(
        params: Params,
        model: Box<dyn KinematicModel + Send>,
        initial_deg: &[f64; NUM_JOINTS],
    ) -> Result<Self, ArmCtrlError> {
        let joints = JointStore::new(&params, initial_deg)?;

        Ok(Self {
            params,
            model,
            joints,
            report: StatusReport::default(),
        })
    }

    /// Advance the controller by one tick toward the source's current pose.
    ///
    /// If the source is inactive the tick is skipped and the joints hold.
    pub fn advance(
        &mut self,
        dt_s: f64,
        source: &dyn PoseSource,
        measured_deg: Option<[f64; NUM_JOINTS]>,
    ) -> Result<(ArmDems, StatusReport), ArmCtrlError> {
        let target = if source.is_active() {
            source.current_pose()
        } else {
            None
        };

        self.proc(&InputData {
            dt_s,
            target,
            measured_deg,
        })
    }

    /// The current state of the joints.
    pub fn joints(&self) -> &JointStore {
        &self.joints
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// The status report of the last tick.
    pub fn report(&self) -> &StatusReport {
        &self.report
    }

    /// Pose of the end effector at the commanded joint angles.
    pub fn end_effector(&self) -> Pose {
        self.model.end_effector(&self.joints.cmd_deg())
    }

    fn dems(&self) -> ArmDems {
        ArmDems {
            pos_deg: self.joints.cmd_deg(),
        }
    }

    /// Run the solver iterations for one tick.
    fn solve(&mut self, target: &Pose, dt_s: f64) {
        let tick_start_deg = self.joints.cmd_deg();

        for iteration in 1..=self.params.max_iterations {
            let cmd_deg = self.joints.cmd_deg();

            let ee = self.model.end_effector(&cmd_deg);
            if !ee.is_finite() {
                warn!("End effector pose is not finite, stopping the solve");
                self.report.skipped = iteration == 1;
                break;
            }

            let mut jacobian = self.model.jacobian(&cmd_deg);
            if sanitise_jacobian(&mut jacobian) {
                warn!("Non-finite Jacobian entries replaced with zero");
                self.report.jacobian_sanitised = true;
            }

            let err = pose_error::calc_pose_error(&ee, target);
            let vel_rads = dls::solve(&jacobian, &err.pos_m, &err.rot_deg, &self.params);

            integrator::step(
                &mut self.joints,
                &tick_start_deg,
                &vel_rads,
                dt_s,
                &mut self.report,
            );
            self.report.iterations = iteration;

            let ee = self.model.end_effector(&self.joints.cmd_deg());
            self.report.pos_err_m = pose_error::distance_m(&ee, target);
            self.report.rot_err_deg = pose_error::angle_deg(&ee, target);

            if self.report.pos_err_m < self.params.dist_tolerance_m
                && self.report.rot_err_deg < self.params.ang_tolerance_deg
            {
                self.report.converged = true;
                break;
            }
        }

        debug!(
            "ArmCtrl: {} iterations, converged: {}, err {:.4} m {:.3} deg",
            self.report.iterations,
            self.report.converged,
            self.report.pos_err_m,
            self.report.rot_err_deg
        );
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::pose_source::{HandTracker, ManualTarget};
    use nalgebra::{Matrix6, UnitQuaternion, Vector3};

    /// Model whose end effector position is the first three joint angles and
    /// whose attitude is the rotation vector of the last three, all in
    /// radians, so the Jacobian near zero is the identity.
    struct IdentityModel;

    impl KinematicModel for IdentityModel {
        fn end_effector(&self, q: &[f64; NUM_JOINTS]) -> Pose {
            let r = |i: usize| q[i].to_radians();
            Pose {
                position_m: Vector3::new(r(0), r(1), r(2)),
                attitude_q: UnitQuaternion::from_scaled_axis(Vector3::new(r(3), r(4), r(5))),
            }
        }

        fn jacobian(&self, _q: &[f64; NUM_JOINTS]) -> Matrix6<f64> {
            Matrix6::identity()
        }
    }

    fn identity_ctrl() -> ArmCtrl {
        ArmCtrl::with_model(Params::default(), Box::new(IdentityModel), &[0.0; NUM_JOINTS])
            .unwrap()
    }

    #[test]
    fn test_converges_in_one_iteration() {
        let mut ctrl = identity_ctrl();
        let target = ManualTarget::new(Pose::from_position_rpy([0.005, 0.0, 0.0], [0.0; 3]));

        let (dems, report) = ctrl.advance(0.02, &target, None).unwrap();

        assert!(report.converged);
        assert!(!report.skipped);
        assert_eq!(report.iterations, 1);
        assert!(report.pos_err_m < 0.005);
        assert!(dems.pos_deg[0] > 0.0);
    }

    #[test]
    fn test_reduces_error_toward_distant_target() {
        let mut ctrl = identity_ctrl();
        let target = ManualTarget::new(Pose::from_position_rpy([0.2, -0.1, 0.0], [0.0; 3]));

        let mut prev = f64::INFINITY;
        for _ in 0..20 {
            let (_, report) = ctrl.advance(0.02, &target, None).unwrap();
            assert_eq!(report.iterations, ctrl.params().max_iterations);
            assert!(!report.converged);
            assert!(report.pos_err_m < prev);
            prev = report.pos_err_m;
        }
    }

    #[test]
    fn test_inactive_source_holds() {
        let mut ctrl = identity_ctrl();
        let tracker = HandTracker::default();

        let (dems, report) = ctrl
            .advance(0.02, &tracker, Some([1.0, 2.0, 3.0, 4.0, 5.0, 6.0]))
            .unwrap();

        assert!(report.skipped);
        assert_eq!(report.iterations, 0);
        assert_eq!(dems.pos_deg, [0.0; NUM_JOINTS]);
        assert_eq!(ctrl.joints().current_deg(), [1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_non_finite_target_holds() {
        let mut ctrl = identity_ctrl();
        let mut pose = Pose::default();
        pose.position_m.x = f64::NAN;

        let (dems, report) = ctrl
            .proc(&InputData {
                dt_s: 0.02,
                target: Some(pose),
                measured_deg: None,
            })
            .unwrap();

        assert!(report.skipped);
        assert_eq!(dems.pos_deg, [0.0; NUM_JOINTS]);
    }

    #[test]
    fn test_invalid_tick_period() {
        let mut ctrl = identity_ctrl();
        let target = ManualTarget::default();

        for dt in [0.0, -0.02, f64::NAN].iter() {
            match ctrl.advance(*dt, &target, None) {
                Err(ArmCtrlError::InvalidTickPeriod(_)) => (),
                _ => panic!("tick period {} accepted", dt),
            }
        }
    }

    #[test]
    fn test_new_rejects_bad_chain() {
        let mut params = Params::default();
        params.chain.links.clear();

        match ArmCtrl::new(params, &[0.0; NUM_JOINTS]) {
            Err(ArmCtrlError::ChainError(_)) => (),
            _ => panic!("chain with no links accepted"),
        }
    }
}
