mod common;

use common::{floats, headless};
use staplegl::error::GlError;
use staplegl::{
    DrawHint, GpuBuffer, InstanceBuffer, ShaderDataType, VertexArray, VertexAttribute,
    VertexBufferLayout,
};

fn offset_layout() -> VertexBufferLayout {
    VertexBufferLayout::new([VertexAttribute::new(ShaderDataType::Vec3, "offset")])
}

fn instance(i: usize) -> [f32; 3] {
    [i as f32, 0.0, 0.0]
}

#[test]
fn starts_at_initial_data_size() {
    let (ctx, backend) = headless();
    let data = [instance(0), instance(1)];
    let buffer = InstanceBuffer::new(&ctx, &data, offset_layout(), DrawHint::Dynamic).unwrap();

    assert_eq!(buffer.instance_count(), 2);
    assert_eq!(buffer.instance_size(), 12);
    assert_eq!(buffer.capacity(), 24);
    assert_eq!(floats(&backend, buffer.id()), [0.0, 0.0, 0.0, 1.0, 0.0, 0.0]);
}

#[test]
fn rejects_partial_initial_instances() {
    let (ctx, _backend) = headless();
    let result = InstanceBuffer::new(&ctx, &[1.0f32; 5], offset_layout(), DrawHint::Dynamic);

    assert!(matches!(
        result,
        Err(GlError::DataSize { expected: 24, actual: 20, .. })
    ));
}

#[test]
fn grows_one_then_thirty_two_then_golden_ratio() {
    let (ctx, backend) = headless();
    let mut buffer =
        InstanceBuffer::new(&ctx, &[] as &[f32], offset_layout(), DrawHint::Dynamic).unwrap();
    let id = buffer.id();
    assert_eq!(buffer.capacity(), 0);

    buffer.add_instance(&instance(0)).unwrap();
    assert_eq!(buffer.capacity(), 12);

    buffer.add_instance(&instance(1)).unwrap();
    assert_eq!(buffer.capacity(), 12 * 32);

    for i in 2..32 {
        buffer.add_instance(&instance(i)).unwrap();
    }
    assert_eq!(buffer.capacity(), 384);

    assert_eq!(buffer.add_instance(&instance(32)).unwrap(), 32);
    assert_eq!(buffer.capacity(), 621);
    assert_eq!(buffer.instance_count(), 33);

    // growth reallocates in place and cleans up after itself
    assert_eq!(buffer.id(), id);
    assert_eq!(backend.live_buffers(), 1);
    assert_eq!(backend.pending_errors(), 0);

    assert_eq!(backend.buffer_contents(id).map(|b| b.len()), Some(621));
    let contents = floats(&backend, id);
    for i in 0..33 {
        assert_eq!(contents[i * 3..i * 3 + 3], instance(i), "instance {i}");
    }
}

#[test]
fn growth_jumps_past_several_steps_when_needed() {
    let (ctx, _backend) = headless();
    let layout = VertexBufferLayout::new([VertexAttribute::new(ShaderDataType::Float32, "x")]);
    let mut buffer = InstanceBuffer::new(&ctx, &[1.0f32, 2.0], layout, DrawHint::Stream).unwrap();

    // 8 bytes isn't one stride, so the next step is 8 * phi = 12
    buffer.add_instance(&[3.0f32]).unwrap();
    assert_eq!(buffer.capacity(), 12);
    assert_eq!(buffer.instance_count(), 3);
}

#[test]
fn delete_moves_last_instance_into_hole() {
    let (ctx, backend) = headless();
    let data = [instance(0), instance(1), instance(2)];
    let mut buffer = InstanceBuffer::new(&ctx, &data, offset_layout(), DrawHint::Dynamic).unwrap();

    assert_eq!(buffer.delete_instance(0).unwrap(), Some(2));
    assert_eq!(buffer.instance_count(), 2);
    assert_eq!(floats(&backend, buffer.id())[..6], [2.0, 0.0, 0.0, 1.0, 0.0, 0.0]);

    // removing the last instance moves nothing
    assert_eq!(buffer.delete_instance(1).unwrap(), None);
    assert_eq!(buffer.instance_count(), 1);
    assert_eq!(backend.pending_errors(), 0);
}

#[test]
fn delete_out_of_range_is_an_error() {
    let (ctx, _backend) = headless();
    let mut buffer =
        InstanceBuffer::new(&ctx, &[instance(0)], offset_layout(), DrawHint::Dynamic).unwrap();

    assert!(matches!(
        buffer.delete_instance(1),
        Err(GlError::InstanceOutOfRange { index: 1, count: 1 })
    ));
    assert_eq!(buffer.instance_count(), 1);
}

#[test]
fn update_only_touches_live_instances() {
    let (ctx, backend) = headless();
    let data = [instance(0), instance(1)];
    let mut buffer = InstanceBuffer::new(&ctx, &data, offset_layout(), DrawHint::Dynamic).unwrap();

    buffer.update_instance(1, &[7.0f32, 8.0, 9.0]).unwrap();
    assert_eq!(floats(&backend, buffer.id())[3..], [7.0, 8.0, 9.0]);

    assert!(matches!(
        buffer.update_instance(2, &instance(2)),
        Err(GlError::InstanceOutOfRange { index: 2, count: 2 })
    ));
}

#[test]
fn instances_must_be_exactly_one_stride() {
    let (ctx, _backend) = headless();
    let mut buffer =
        InstanceBuffer::new(&ctx, &[] as &[f32], offset_layout(), DrawHint::Dynamic).unwrap();

    assert!(matches!(
        buffer.add_instance(&[1.0f32, 2.0]),
        Err(GlError::DataSize { expected: 12, actual: 8, .. })
    ));
    assert_eq!(buffer.instance_count(), 0);
    assert_eq!(buffer.capacity(), 0);
}

#[test]
fn missing_layout_is_reported() {
    let (ctx, _backend) = headless();
    let mut buffer = InstanceBuffer::new(
        &ctx,
        &[] as &[f32],
        VertexBufferLayout::default(),
        DrawHint::Dynamic,
    )
    .unwrap();

    assert!(matches!(
        buffer.add_instance(&[1.0f32]),
        Err(GlError::MissingLayout)
    ));
}

#[test]
fn clear_keeps_storage() {
    let (ctx, _backend) = headless();
    let mut buffer =
        InstanceBuffer::new(&ctx, &[] as &[f32], offset_layout(), DrawHint::Dynamic).unwrap();
    for i in 0..3 {
        buffer.add_instance(&instance(i)).unwrap();
    }
    let capacity = buffer.capacity();

    buffer.clear_instances();
    assert_eq!(buffer.instance_count(), 0);
    assert_eq!(buffer.capacity(), capacity);

    assert_eq!(buffer.add_instance(&instance(9)).unwrap(), 0);
    assert_eq!(buffer.capacity(), capacity);
}

#[test]
fn vertex_array_binding_survives_growth() {
    let (ctx, backend) = headless();
    let mut vao = VertexArray::new(&ctx).unwrap();
    let buffer =
        InstanceBuffer::new(&ctx, &[instance(0)], offset_layout(), DrawHint::Dynamic).unwrap();
    let id = buffer.id();
    vao.set_instance_buffer(buffer);

    let instances = vao.instance_buffer_mut().unwrap();
    for i in 1..40 {
        instances.add_instance(&instance(i)).unwrap();
    }

    let attribute = backend.vertex_attribute(vao.id(), 0).unwrap();
    assert_eq!(attribute.buffer, Some(id));
    assert_eq!(attribute.divisor, 1);
    assert_eq!(floats(&backend, id)[39 * 3], 39.0);
}
