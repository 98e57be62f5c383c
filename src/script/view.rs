// Read-only scene queries available to scripts

use std::collections::BTreeSet;

use glam::IVec2;

use super::action::Target;
use crate::engine::ids::ObjectId;
use crate::engine::requests::RequestQueue;
use crate::scene::mover::Mover;
use crate::scene::object::{ObjectSet, SceneObject};
use crate::scene::walk::WalkRegions;

/// Snapshot-free view of the scene for one step
///
/// Scripts decide fallbacks (for example teleporting instead of walking to
/// an unreachable spot) by querying this view before returning effects.
pub struct SceneView<'a> {
    objects: &'a ObjectSet,
    walk: &'a WalkRegions,
    requests: &'a RequestQueue,
    playing_sounds: &'a BTreeSet<u32>,
    owner: Option<ObjectId>,
    default_move_step: IVec2,
    tick: u64,
}

impl<'a> SceneView<'a> {
    pub(crate) fn new(
        objects: &'a ObjectSet,
        walk: &'a WalkRegions,
        requests: &'a RequestQueue,
        playing_sounds: &'a BTreeSet<u32>,
        owner: Option<ObjectId>,
        default_move_step: IVec2,
        tick: u64,
    ) -> Self {
        Self {
            objects,
            walk,
            requests,
            playing_sounds,
            owner,
            default_move_step,
            tick,
        }
    }

    /// Current scheduler tick
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// The object owning the running Action, if any
    pub fn owner(&self) -> Option<&'a SceneObject> {
        self.owner.and_then(|id| self.objects.get(id))
    }

    pub fn object(&self, target: &Target) -> Option<&'a SceneObject> {
        let id = target.resolve(self.objects, self.owner)?;
        self.objects.get(id)
    }

    pub fn position(&self, target: &Target) -> Option<IVec2> {
        self.object(target).map(|object| object.position)
    }

    /// Whether the object is still mid-animation
    pub fn is_animating(&self, target: &Target) -> bool {
        self.object(target).is_some_and(SceneObject::is_animating)
    }

    pub fn is_moving(&self, target: &Target) -> bool {
        self.object(target).is_some_and(SceneObject::is_moving)
    }

    /// Whether a Mover sent to `point` could ever arrive
    ///
    /// Every intermediate step must stay inside the enabled walk regions, so
    /// a walkable spot in a region cut off from the object is unreachable.
    pub fn can_reach(&self, target: &Target, point: IVec2) -> bool {
        let Some(object) = self.object(target) else {
            return false;
        };
        let step = object.move_step.unwrap_or(self.default_move_step);
        Mover::can_arrive(object.position, point, step, self.walk)
    }

    /// Whether a sound is queued or reported playing by the host
    pub fn is_sound_playing(&self, sound: u32) -> bool {
        self.playing_sounds.contains(&sound) || self.requests.is_sound_queued(sound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Rect;
    use crate::engine::requests::HostRequest;

    #[test]
    fn test_queries() {
        let mut objects = ObjectSet::new();
        let player = objects
            .insert(SceneObject::new("player").at(10, 140))
            .expect("insert");
        let mut walk = WalkRegions::new();
        walk.add(1, Rect::new(0, 100, 320, 168));
        let mut requests = RequestQueue::default();
        requests.push(HostRequest::PlaySound(26));
        let playing = BTreeSet::from([3]);

        let view = SceneView::new(
            &objects,
            &walk,
            &requests,
            &playing,
            Some(player),
            IVec2::new(4, 2),
            12,
        );

        assert_eq!(view.tick(), 12);
        assert_eq!(view.owner().map(|o| o.name.as_str()), Some("player"));
        assert_eq!(view.position(&Target::Owner), Some(IVec2::new(10, 140)));
        assert!(view.can_reach(&Target::Owner, IVec2::new(300, 150)));
        assert!(!view.can_reach(&Target::Owner, IVec2::new(300, 20)));
        assert!(!view.can_reach(&Target::named("laura"), IVec2::new(20, 150)));
        assert!(view.is_sound_playing(3));
        assert!(view.is_sound_playing(26));
        assert!(!view.is_sound_playing(1));
        assert!(!view.is_animating(&Target::Owner));
    }

    #[test]
    fn test_disconnected_region_unreachable() {
        let mut objects = ObjectSet::new();
        let walker = objects
            .insert(SceneObject::new("walker").with_move_step(IVec2::new(10, 10)))
            .expect("insert");
        let mut walk = WalkRegions::new();
        walk.add(1, Rect::new(0, 0, 100, 10));
        walk.add(2, Rect::new(200, 0, 300, 10));
        let requests = RequestQueue::default();
        let playing = BTreeSet::new();
        let view = SceneView::new(
            &objects,
            &walk,
            &requests,
            &playing,
            Some(walker),
            IVec2::ONE,
            0,
        );

        assert!(view.can_reach(&Target::Owner, IVec2::new(90, 0)));
        assert!(!view.can_reach(&Target::Owner, IVec2::new(250, 0)));
    }

    #[test]
    fn test_zero_step_axis_unreachable() {
        let mut objects = ObjectSet::new();
        let crate_box = objects
            .insert(SceneObject::new("crate").with_move_step(IVec2::new(3, 0)))
            .expect("insert");
        let walk = WalkRegions::new();
        let requests = RequestQueue::default();
        let playing = BTreeSet::new();
        let view = SceneView::new(
            &objects,
            &walk,
            &requests,
            &playing,
            Some(crate_box),
            IVec2::ONE,
            0,
        );

        assert!(view.can_reach(&Target::Owner, IVec2::new(30, 0)));
        assert!(!view.can_reach(&Target::Owner, IVec2::new(30, 5)));
    }
}
