use crate::scene_graph::{ObjectId, Scene};

/// Quadratic ease-in-out: accelerates through the first half, decelerates through the second.
pub fn ease_in_out_quad(t: f64) -> f64 {
    if t < 0.5 {
        2.0 * t * t
    } else {
        -1.0 + (4.0 - 2.0 * t) * t
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Armed,
    Running,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmOutcome {
    Armed,
    /// Already running; timing is left untouched so the objects do not jump.
    AlreadyRunning,
    /// The run finished; it only restarts with a fresh session.
    Finished,
}

/// One-shot run state. `start_time` is the timestamp of the first frame after arming.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AnimationRun {
    pub started: bool,
    pub start_time: Option<f64>,
    pub completed: bool,
}

impl AnimationRun {
    pub fn phase(&self) -> RunPhase {
        match (self.started, self.start_time, self.completed) {
            (_, _, true) => RunPhase::Done,
            (false, _, false) => RunPhase::Idle,
            (true, None, false) => RunPhase::Armed,
            (true, Some(_), false) => RunPhase::Running,
        }
    }

    pub fn can_arm(&self) -> bool {
        matches!(self.phase(), RunPhase::Idle | RunPhase::Armed)
    }

    pub fn arm(&mut self) -> ArmOutcome {
        match self.phase() {
            RunPhase::Idle | RunPhase::Armed => {
                self.started = true;
                self.start_time = None;
                self.completed = false;
                ArmOutcome::Armed
            }
            RunPhase::Running => ArmOutcome::AlreadyRunning,
            RunPhase::Done => ArmOutcome::Finished,
        }
    }

    /// Normalised progress at `now`, recording the start on the first call after arming.
    ///
    /// Returns `None` when the run is not active.
    pub fn progress(&mut self, now: f64, duration: f64) -> Option<f64> {
        if !self.started || self.completed {
            return None;
        }

        let start = *self.start_time.get_or_insert(now);
        let elapsed = (now - start).max(0.0);

        if duration <= 0.0 {
            return Some(1.0);
        }

        Some((elapsed / duration).min(1.0))
    }
}

/// Start and end of one object's travel along X.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisTrack {
    pub start: f32,
    pub end: f32,
}

impl AxisTrack {
    pub fn at(&self, eased: f64) -> f32 {
        (self.start as f64 + (self.end as f64 - self.start as f64) * eased) as f32
    }
}

/// What a single frame of the driver did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DriverEvent {
    Inactive,
    Advanced { t: f64, eased: f64 },
    /// The run reached its end on this frame. Emitted exactly once per run.
    Completed,
}

/// Moves the socket and plug together along their tracks once armed.
#[derive(Debug, Clone)]
pub struct AnimationDriver {
    pub run: AnimationRun,
    pub duration: f64,
    pub socket_track: AxisTrack,
    pub plug_track: AxisTrack,
}

impl AnimationDriver {
    pub fn new(duration: f64, socket_track: AxisTrack, plug_track: AxisTrack) -> Self {
        Self {
            run: AnimationRun::default(),
            duration,
            socket_track,
            plug_track,
        }
    }

    pub fn arm(&mut self) -> ArmOutcome {
        self.run.arm()
    }

    pub fn phase(&self) -> RunPhase {
        self.run.phase()
    }

    /// Advances the run for a frame at `now` (seconds).
    ///
    /// Does nothing until both objects are in the scene; timing starts with the
    /// first frame in which they both exist.
    pub fn update(
        &mut self,
        now: f64,
        scene: &mut Scene,
        socket: Option<ObjectId>,
        plug: Option<ObjectId>,
    ) -> DriverEvent {
        let (Some(socket), Some(plug)) = (socket, plug) else {
            return DriverEvent::Inactive;
        };

        let Some(t) = self.run.progress(now, self.duration) else {
            return DriverEvent::Inactive;
        };

        if t >= 1.0 {
            self.run.completed = true;
            scene.set_object_x(socket, self.socket_track.end);
            scene.set_object_x(plug, self.plug_track.end);
            return DriverEvent::Completed;
        }

        let eased = ease_in_out_quad(t);
        scene.set_object_x(socket, self.socket_track.at(eased));
        scene.set_object_x(plug, self.plug_track.at(eased));

        DriverEvent::Advanced { t, eased }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene_graph::Object3D;
    use glam::Vec3;

    const SOCKET: AxisTrack = AxisTrack {
        start: 111.5,
        end: 120.0,
    };
    const PLUG: AxisTrack = AxisTrack {
        start: -11.4,
        end: -14.8,
    };

    fn scene_with_objects() -> (Scene, ObjectId, ObjectId) {
        let mut scene = Scene::new();
        let socket = scene.add_object(Object3D::named("socket"));
        let plug = scene.add_object(Object3D::named("plug"));
        scene.set_object_translation(socket, Vec3::new(SOCKET.start, -1.6, 106.6));
        scene.set_object_translation(plug, Vec3::new(PLUG.start, 0.0, -6.5));
        (scene, socket, plug)
    }

    fn x_of(scene: &Scene, id: ObjectId) -> f32 {
        scene.get_object_transform(id).unwrap().translation().x
    }

    #[test]
    fn ease_hits_fixed_points() {
        assert_eq!(ease_in_out_quad(0.0), 0.0);
        assert_eq!(ease_in_out_quad(0.5), 0.5);
        assert_eq!(ease_in_out_quad(1.0), 1.0);
    }

    #[test]
    fn ease_is_monotonic_and_continuous() {
        let steps = 10_000;
        let mut previous = ease_in_out_quad(0.0);

        for i in 1..=steps {
            let t = i as f64 / steps as f64;
            let value = ease_in_out_quad(t);
            assert!(value >= previous, "ease decreased at t={t}");
            assert!(value - previous < 1e-3, "ease jumped at t={t}");
            previous = value;
        }

        let below = ease_in_out_quad(0.5 - 1e-9);
        let above = ease_in_out_quad(0.5 + 1e-9);
        assert!((above - below).abs() < 1e-8);
    }

    #[test]
    fn run_walks_through_its_phases() {
        let mut run = AnimationRun::default();
        assert_eq!(run.phase(), RunPhase::Idle);
        assert_eq!(run.progress(0.0, 2.0), None);

        assert_eq!(run.arm(), ArmOutcome::Armed);
        assert_eq!(run.phase(), RunPhase::Armed);

        assert_eq!(run.progress(3.0, 2.0), Some(0.0));
        assert_eq!(run.phase(), RunPhase::Running);
        assert_eq!(run.start_time, Some(3.0));

        assert_eq!(run.arm(), ArmOutcome::AlreadyRunning);
        assert_eq!(run.start_time, Some(3.0));

        run.completed = true;
        assert_eq!(run.phase(), RunPhase::Done);
        assert_eq!(run.arm(), ArmOutcome::Finished);
        assert!(!run.can_arm());
    }

    #[test]
    fn rearming_before_first_frame_is_accepted() {
        let mut run = AnimationRun::default();
        run.arm();
        assert_eq!(run.arm(), ArmOutcome::Armed);
        assert!(run.can_arm());
    }

    #[test]
    fn frames_follow_the_expected_progress_sequence() {
        let (mut scene, socket, plug) = scene_with_objects();
        let mut driver = AnimationDriver::new(2.0, SOCKET, PLUG);
        driver.arm();

        let mut progress = Vec::new();
        let mut completions = 0;

        for now in [0.0, 0.5, 1.0, 1.5, 2.0, 2.5] {
            match driver.update(now, &mut scene, Some(socket), Some(plug)) {
                DriverEvent::Advanced { t, .. } => progress.push(t),
                DriverEvent::Completed => {
                    assert_eq!(now, 2.0);
                    progress.push(1.0);
                    completions += 1;
                }
                DriverEvent::Inactive => assert_eq!(now, 2.5),
            }
        }

        assert_eq!(progress, [0.0, 0.25, 0.5, 0.75, 1.0]);
        assert_eq!(completions, 1);
    }

    #[test]
    fn completion_snaps_exactly_to_the_end() {
        let (mut scene, socket, plug) = scene_with_objects();
        let mut driver = AnimationDriver::new(2.0, SOCKET, PLUG);
        driver.arm();

        driver.update(10.0, &mut scene, Some(socket), Some(plug));
        assert_eq!(
            driver.update(17.3, &mut scene, Some(socket), Some(plug)),
            DriverEvent::Completed
        );

        assert_eq!(x_of(&scene, socket), SOCKET.end);
        assert_eq!(x_of(&scene, plug), PLUG.end);
        assert!(driver.run.completed);
    }

    #[test]
    fn completed_run_ignores_further_frames() {
        let (mut scene, socket, plug) = scene_with_objects();
        let mut driver = AnimationDriver::new(2.0, SOCKET, PLUG);
        driver.arm();
        driver.update(0.0, &mut scene, Some(socket), Some(plug));
        driver.update(2.0, &mut scene, Some(socket), Some(plug));

        scene.set_object_x(socket, 0.0);
        for now in [2.1, 3.0, 100.0] {
            assert_eq!(
                driver.update(now, &mut scene, Some(socket), Some(plug)),
                DriverEvent::Inactive
            );
        }
        assert_eq!(x_of(&scene, socket), 0.0);
    }

    #[test]
    fn midpoint_moves_both_objects_halfway() {
        let (mut scene, socket, plug) = scene_with_objects();
        let mut driver = AnimationDriver::new(2.0, SOCKET, PLUG);
        driver.arm();
        driver.update(0.0, &mut scene, Some(socket), Some(plug));
        driver.update(1.0, &mut scene, Some(socket), Some(plug));

        assert!((x_of(&scene, socket) - 115.75).abs() < 1e-4);
        assert!((x_of(&scene, plug) - (-13.1)).abs() < 1e-4);
    }

    #[test]
    fn arming_without_objects_waits_for_both() {
        let (mut scene, socket, plug) = scene_with_objects();
        let mut driver = AnimationDriver::new(2.0, SOCKET, PLUG);
        driver.arm();

        assert_eq!(
            driver.update(0.0, &mut scene, Some(socket), None),
            DriverEvent::Inactive
        );
        assert_eq!(
            driver.update(5.0, &mut scene, None, None),
            DriverEvent::Inactive
        );
        assert_eq!(driver.phase(), RunPhase::Armed);
        assert_eq!(x_of(&scene, socket), SOCKET.start);

        assert_eq!(
            driver.update(7.0, &mut scene, Some(socket), Some(plug)),
            DriverEvent::Advanced { t: 0.0, eased: 0.0 }
        );
        assert_eq!(driver.run.start_time, Some(7.0));
    }
}
