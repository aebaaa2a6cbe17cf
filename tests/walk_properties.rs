//! Property test: a full GetNext walk enumerates exactly the scalar set a
//! plugin's shape coerces to, in lexicographic order.

use bytes::Bytes;
use proptest::prelude::*;

use mib_agent::agent::Agent;
use mib_agent::error::ErrorStatus;
use mib_agent::message::{Message, Pdu, PduKind};
use mib_agent::mib::PluginValue;
use mib_agent::oid::Oid;
use mib_agent::value::Value;
use mib_agent::varbind::VarBind;
use mib_agent::oid;

/// Mirror of the producer value grammar, generatable by proptest.
#[derive(Debug, Clone)]
enum Shape {
    Int(i32),
    Str(String),
    Nil,
    List(Vec<Shape>),
    Map(Vec<(u32, Shape)>),
}

fn shape_strategy() -> impl Strategy<Value = Shape> {
    let leaf = prop_oneof![
        (-1000i32..1000).prop_map(Shape::Int),
        "[a-z]{0,6}".prop_map(Shape::Str),
        Just(Shape::Nil),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Shape::List),
            prop::collection::btree_map(0u32..8, inner, 0..4)
                .prop_map(|m| Shape::Map(m.into_iter().collect())),
        ]
    })
}

fn to_plugin_value(shape: &Shape) -> PluginValue {
    match shape {
        Shape::Int(i) => PluginValue::Int(i64::from(*i)),
        Shape::Str(s) => PluginValue::Str(s.clone()),
        Shape::Nil => PluginValue::Nil,
        Shape::List(items) => PluginValue::List(items.iter().map(to_plugin_value).collect()),
        Shape::Map(entries) => {
            PluginValue::map(entries.iter().map(|(k, v)| (*k, to_plugin_value(v))))
        }
    }
}

/// Depth-first over ascending keys: yields scalars in lexicographic order.
fn expected_scalars(shape: &Shape, base: &Oid, out: &mut Vec<(Oid, Value)>) {
    match shape {
        Shape::Int(i) => out.push((base.clone(), Value::Integer(*i))),
        Shape::Str(s) => out.push((base.clone(), Value::string(s))),
        Shape::Nil => {}
        Shape::List(items) => {
            for (i, item) in items.iter().enumerate() {
                expected_scalars(item, &base.child(i as u32), out);
            }
        }
        Shape::Map(entries) => {
            for (key, item) in entries {
                expected_scalars(item, &base.child(*key), out);
            }
        }
    }
}

const SYSTEM_GROUP: [u32; 7] = [1, 3, 6, 1, 2, 1, 1];

async fn walk_all(agent: &Agent) -> Vec<(Oid, Value)> {
    let mut seen = Vec::new();
    let mut at = Oid::empty();
    loop {
        let request = Message::new(
            Bytes::from_static(b"public"),
            Pdu::request(
                PduKind::GetNextRequest,
                1,
                vec![VarBind::null(at.clone())],
            ),
        );
        let response = agent.process_get_next_request(request).await;
        if response.pdu.error_status != ErrorStatus::NoError {
            assert_eq!(response.pdu.error_status, ErrorStatus::NoSuchName);
            assert_eq!(response.pdu.varbinds[0].name, oid!(0));
            return seen;
        }
        let vb = &response.pdu.varbinds[0];
        assert!(
            vb.name > at,
            "walk went backwards: {} after {at}",
            vb.name
        );
        seen.push((vb.name.clone(), vb.value.clone()));
        at = vb.name.clone();
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn walk_enumerates_exactly_the_coerced_scalars(shape in shape_strategy()) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .expect("runtime");
        runtime.block_on(async {
            let base = oid!(4, 4);
            let mut agent = Agent::builder().build();
            let value = to_plugin_value(&shape);
            agent
                .add_plugin(base.clone(), move |_| Ok(value.clone()))
                .expect("fresh mount point");

            let walked: Vec<(Oid, Value)> = walk_all(&agent)
                .await
                .into_iter()
                .filter(|(name, _)| !name.arcs().starts_with(&SYSTEM_GROUP))
                .collect();

            let mut expected = Vec::new();
            expected_scalars(&shape, &base, &mut expected);

            prop_assert_eq!(walked, expected);
            Ok(())
        })?;
    }
}
