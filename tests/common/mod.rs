use staplegl::Context;
use staplegl::backend::{BufferId, HeadlessBackend};
use std::rc::Rc;

pub fn headless() -> (Context, Rc<HeadlessBackend>) {
    let _ = env_logger::builder().is_test(true).try_init();
    Context::headless()
}

#[allow(dead_code)]
pub fn floats(backend: &HeadlessBackend, buffer: BufferId) -> Vec<f32> {
    let bytes = backend.buffer_contents(buffer).unwrap_or_default();
    bytemuck::pod_collect_to_vec(&bytes)
}
