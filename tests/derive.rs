#![cfg(feature = "derive")]

mod common;

use bytemuck::{Pod, Zeroable};
use common::{floats, headless};
use nalgebra::Vector4;
use staplegl::{
    DrawHint, GpuBuffer, InstanceBuffer, ShaderDataType, Vertex, VertexArray, VertexBuffer,
    VertexBufferLayout, VertexSource,
};

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable, Vertex)]
struct Particle {
    offset: [f32; 3],
    tint: Vector4<f32>,
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable, Vertex)]
struct Position {
    position: [f32; 2],
}

fn particle(x: f32) -> Particle {
    Particle {
        offset: [x, 0.0, 0.0],
        tint: Vector4::new(1.0, 1.0, 1.0, 1.0),
    }
}

#[test]
fn derived_layout_follows_fields() {
    let layout = VertexBufferLayout::of::<Particle>();

    assert_eq!(layout.stride(), 28);
    assert_eq!(Particle::stride(), size_of::<Particle>());

    let names: Vec<_> = layout.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, ["offset", "tint"]);

    let tint = layout.get("tint").unwrap();
    assert_eq!(tint.data_type, ShaderDataType::Vec4);
    assert_eq!(tint.offset, 12);
}

#[test]
fn derived_types_fill_a_vertex_array() {
    let (ctx, backend) = headless();
    let mut vao = VertexArray::new(&ctx).unwrap();

    let quad = [
        Position { position: [0.0, 0.0] },
        Position { position: [1.0, 0.0] },
        Position { position: [1.0, 1.0] },
    ];
    vao.add_vertex_buffer(VertexBuffer::from_vertices(&ctx, &quad, DrawHint::Static).unwrap());
    vao.set_instance_buffer(
        InstanceBuffer::from_instances(&ctx, &[particle(0.0)], DrawHint::Dynamic).unwrap(),
    );

    assert_eq!(vao.buffers()[0].vertex_count(), 3);

    let tint = backend.vertex_attribute(vao.id(), 2).unwrap();
    assert_eq!((tint.components, tint.stride, tint.offset), (4, 28, 12));
    assert_eq!(tint.divisor, 1);

    let instances = vao.instance_buffer_mut().unwrap();
    instances.add_instance(&[particle(5.0)]).unwrap();
    assert_eq!(instances.instance_size(), 28);
    assert_eq!(floats(&backend, instances.id())[7], 5.0);
}
