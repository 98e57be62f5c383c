// Arena keys for scene-scoped entities
//
// Every key is generational: a key from a torn-down arena never resolves to
// a live entry in that arena again.

use slotmap::new_key_type;

new_key_type! {
    /// Key of a `SceneObject` inside its scene
    pub struct ObjectId;
    /// Key of an Action inside the scheduler arena
    pub struct ActionId;
    /// Key of a running sequence inside the `SequenceManager`
    pub struct SequenceId;
}
