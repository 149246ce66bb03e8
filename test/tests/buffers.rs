use tweak_client::TweakClientError;
use tweak_server::shared::{
    Buffer, BufferData, ElementType, ItemOptions, Metadata, Order, StoreError, Value, ValueType,
};
use tweak_test::{assert_mirror_converges, TestPair};

fn matrix(values: Vec<i16>, order: Order) -> Buffer {
    Buffer::new(values, vec![2, 3], order).unwrap()
}

/// Shape, element type and order survive the trip to the mirror and back
#[test]
fn column_major_buffer_round_trip() {
    let pair = TestPair::new();
    let metadata = Metadata::parse(
        r#"{"layout": {"dimensions": [2, 3], "order": "column-major"}}"#,
    )
    .unwrap();
    let initial = matrix(vec![1, 2, 3, 4, 5, 6], Order::ColumnMajor);
    let id = pair
        .server
        .add("/m/grid", initial.clone(), ItemOptions::new().with_metadata(metadata))
        .unwrap();

    let client = pair.client();
    client.collect(&["/m/grid"]).unwrap();
    let mirrored = client.get(id).unwrap();
    assert_eq!(mirrored, Value::Buffer(initial));
    let buffer = mirrored.as_buffer().unwrap();
    assert_eq!(buffer.order(), Order::ColumnMajor);
    assert_eq!(buffer.shape(), &[2, 3]);
    assert_eq!(buffer.element_type(), ElementType::I16);
    assert_eq!(
        client.descriptor(id).unwrap().value_type,
        ValueType::Buffer(ElementType::I16)
    );

    let updated = matrix(vec![-1, -2, -3, -4, -5, -6], Order::ColumnMajor);
    client.set(id, updated.clone()).unwrap();
    assert_mirror_converges!(client, id, updated.clone());
    assert_eq!(pair.server.get(id), Ok(Value::Buffer(updated)));
}

/// Metadata dimensions must agree with the initial buffer
#[test]
fn declared_dimensions_enforced() {
    let pair = TestPair::new();
    let metadata = Metadata::parse(r#"{"layout": {"dimensions": [3, 2]}}"#).unwrap();
    let result = pair.server.add(
        "/m/wrong",
        matrix(vec![0; 6], Order::RowMajor),
        ItemOptions::new().with_metadata(metadata),
    );
    assert_eq!(
        result,
        Err(StoreError::ShapeMismatch {
            expected: vec![3, 2],
            actual: vec![2, 3],
        })
    );
    assert!(pair.server.find("/m/wrong").is_err());
}

/// Wrong shapes and element types are rejected before anything is sent
#[test]
fn buffer_writes_checked() {
    let pair = TestPair::new();
    let id = pair
        .server
        .add("/m/vec", Buffer::vector(vec![0.0_f64; 4]), ItemOptions::new())
        .unwrap();
    let client = pair.client();
    client.collect(&["/m/vec"]).unwrap();

    assert!(matches!(
        client.set(id, Buffer::vector(vec![0.0_f64; 5])),
        Err(TweakClientError::Store(StoreError::ShapeMismatch { .. }))
    ));
    assert!(matches!(
        client.set(id, Buffer::vector(vec![0.0_f32; 4])),
        Err(TweakClientError::Store(StoreError::TypeMismatch { .. }))
    ));
    assert!(matches!(
        pair.server.set(id, Buffer::vector(vec![0_u8; 4])),
        Err(StoreError::TypeMismatch { .. })
    ));

    client.set(id, Buffer::vector(vec![1.0_f64, 2.0, 3.0, 4.0])).unwrap();
    let expected = Value::Buffer(Buffer::vector(vec![1.0_f64, 2.0, 3.0, 4.0]));
    assert_eq!(pair.server.get(id), Ok(expected));
}

/// Every element type makes it through unchanged
#[test]
fn every_element_type_mirrors() {
    let pair = TestPair::new();
    let buffers = vec![
        Buffer::vector(vec![i8::MIN, 0, i8::MAX]),
        Buffer::vector(vec![i16::MIN, 0, i16::MAX]),
        Buffer::vector(vec![i32::MIN, 0, i32::MAX]),
        Buffer::vector(vec![i64::MIN, 0, i64::MAX]),
        Buffer::vector(vec![0_u8, u8::MAX]),
        Buffer::vector(vec![0_u16, u16::MAX]),
        Buffer::vector(vec![0_u32, u32::MAX]),
        Buffer::vector(vec![0_u64, u64::MAX]),
        Buffer::vector(vec![f32::MIN, -0.5, f32::MAX]),
        Buffer::vector(vec![f64::MIN, 1e-300, f64::MAX]),
    ];
    let mut uris = Vec::new();
    for (index, buffer) in buffers.iter().enumerate() {
        let uri = format!("/types/{}", index);
        pair.server
            .add(&uri, buffer.clone(), ItemOptions::new())
            .unwrap();
        uris.push(uri);
    }

    let client = pair.client();
    let uri_refs: Vec<&str> = uris.iter().map(String::as_str).collect();
    let ids = client.collect(&uri_refs).unwrap();
    for (id, buffer) in ids.into_iter().zip(buffers) {
        let mirrored = client.get(id.unwrap()).unwrap();
        assert_eq!(mirrored, Value::Buffer(buffer));
    }
}

/// Zero-sized and rank-0 buffers are valid values
#[test]
fn degenerate_shapes() {
    let pair = TestPair::new();
    let empty = Buffer::new(BufferData::U8(Vec::new()), vec![0, 4], Order::RowMajor).unwrap();
    let scalar = Buffer::new(vec![42_i32], Vec::new(), Order::RowMajor).unwrap();
    let empty_id = pair.server.add("/d/empty", empty.clone(), ItemOptions::new()).unwrap();
    let scalar_id = pair.server.add("/d/scalar", scalar.clone(), ItemOptions::new()).unwrap();

    let client = pair.client();
    client.collect(&["/d/empty", "/d/scalar"]).unwrap();
    assert_eq!(client.get(empty_id), Ok(Value::Buffer(empty)));
    assert_eq!(client.get(scalar_id), Ok(Value::Buffer(scalar)));
}
