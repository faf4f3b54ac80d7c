use anyhow::Result;
use indexmap::IndexMap;
use oni_save::{
    GameInfo, GameObject, GameObjectBehavior, GameObjectGroup, Quaternion, SaveGame,
    SaveGameHeader, StoredItem, TemplateTable, TypeCode, TypeInfo, TypeTemplate,
    TypeTemplateMember, TypedValue, Vector3, parse_save_game, write_save_game,
};

fn base_templates() -> Vec<TypeTemplate> {
    vec![
        TypeTemplate {
            name: "Klei.SaveFileRoot".into(),
            fields: vec![TypeTemplateMember::new(
                "buildVersion",
                TypeInfo::simple(TypeCode::Int32),
            )],
            properties: vec![],
        },
        TypeTemplate {
            name: "Game+Settings".into(),
            fields: vec![TypeTemplateMember::new(
                "difficulty",
                TypeInfo::simple(TypeCode::Int32),
            )],
            properties: vec![],
        },
    ]
}

fn save_with(templates: Vec<TypeTemplate>, groups: Vec<GameObjectGroup>) -> SaveGame {
    let mut world = IndexMap::new();
    world.insert("buildVersion".to_string(), TypedValue::Int32(512719));
    let mut settings = IndexMap::new();
    settings.insert("difficulty".to_string(), TypedValue::Int32(1));

    SaveGame {
        header: SaveGameHeader {
            build_version: 512719,
            header_version: 1,
            is_compressed: false,
            game_info: GameInfo {
                number_of_cycles: 7,
                number_of_duplicants: 3,
                base_name: "Testhaven".into(),
                is_auto_save: false,
                original_save_name: "Testhaven.sav".into(),
                save_major_version: 7,
                save_minor_version: 35,
                cluster_id: "clusters/SandstoneDefault".into(),
                sandbox_enabled: true,
                colony_guid: "cafeb0ba-0000-4000-8000-000000000000".into(),
                dlc_id: "".into(),
                extra: serde_json::Map::new(),
            },
        },
        templates: TemplateTable::new(templates),
        world,
        settings,
        sim_data: vec![],
        version_major: 7,
        version_minor: 35,
        game_objects: groups,
        game_data: vec![],
    }
}

fn entity_at_origin(behaviors: Vec<GameObjectBehavior>) -> GameObject {
    GameObject {
        position: Vector3::default(),
        rotation: Quaternion::identity(),
        scale: Vector3::new(1.0, 1.0, 1.0),
        folder: 0,
        behaviors,
    }
}

#[test]
fn test_behavior_with_template_present() -> Result<()> {
    let mut templates = base_templates();
    templates.push(TypeTemplate {
        name: "MinionIdentity".into(),
        fields: vec![
            TypeTemplateMember::new("name", TypeInfo::simple(TypeCode::String)),
            TypeTemplateMember::new("age", TypeInfo::simple(TypeCode::Int32)),
        ],
        properties: vec![],
    });

    let mut identity = IndexMap::new();
    identity.insert(
        "name".to_string(),
        TypedValue::String(Some("Meep".into())),
    );
    identity.insert("age".to_string(), TypedValue::Int32(50));

    let save = save_with(
        templates,
        vec![GameObjectGroup {
            prefab_name: "Minion".into(),
            objects: vec![entity_at_origin(vec![GameObjectBehavior {
                name: "MinionIdentity".into(),
                template_data: Some(identity.clone()),
                extra_data: vec![],
                extra_raw: vec![],
            }])],
        }],
    );

    let bytes = write_save_game(&save)?;
    let parsed = parse_save_game(&bytes, true, false)?;

    let behavior = &parsed.objects_of("Minion")[0].behaviors[0];
    assert_eq!(behavior.template_data.as_ref(), Some(&identity));
    assert!(behavior.extra_raw.is_empty());
    assert_eq!(write_save_game(&parsed)?, bytes);
    Ok(())
}

#[test]
fn test_behavior_with_template_missing() -> Result<()> {
    // The table carries no "UnknownBehavior" template; its payload is ten
    // zero bytes that must survive untouched.
    let save = save_with(
        base_templates(),
        vec![GameObjectGroup {
            prefab_name: "Minion".into(),
            objects: vec![entity_at_origin(vec![GameObjectBehavior {
                name: "UnknownBehavior".into(),
                template_data: None,
                extra_data: vec![],
                extra_raw: vec![0; 10],
            }])],
        }],
    );

    let bytes = write_save_game(&save)?;
    let parsed = parse_save_game(&bytes, true, false)?;

    let behavior = &parsed.objects_of("Minion")[0].behaviors[0];
    assert_eq!(behavior.name, "UnknownBehavior");
    assert_eq!(behavior.template_data, None);
    assert_eq!(behavior.extra_raw, vec![0; 10]);

    assert_eq!(write_save_game(&parsed)?, bytes);
    Ok(())
}

#[test]
fn test_storage_with_nested_entity() -> Result<()> {
    let mut templates = base_templates();
    templates.push(TypeTemplate {
        name: "Storage".into(),
        fields: vec![
            TypeTemplateMember::new(
                "onlyFetchMarkedItems",
                TypeInfo::simple(TypeCode::Boolean),
            ),
            TypeTemplateMember::new("shouldSaveItems", TypeInfo::simple(TypeCode::Boolean)),
        ],
        properties: vec![],
    });
    templates.push(TypeTemplate {
        name: "PrimaryElement".into(),
        fields: vec![
            TypeTemplateMember::new("ElementID", TypeInfo::simple(TypeCode::Int32)),
            TypeTemplateMember::new("Mass", TypeInfo::simple(TypeCode::Single)),
            TypeTemplateMember::new("Temperature", TypeInfo::simple(TypeCode::Single)),
        ],
        properties: vec![],
    });

    let mut element = IndexMap::new();
    element.insert("ElementID".to_string(), TypedValue::Int32(-1369750864));
    element.insert("Mass".to_string(), TypedValue::Single(100.0));
    element.insert("Temperature".to_string(), TypedValue::Single(293.15));

    let ore = entity_at_origin(vec![GameObjectBehavior {
        name: "PrimaryElement".into(),
        template_data: Some(element),
        extra_data: vec![],
        extra_raw: vec![],
    }]);

    let mut storage_data = IndexMap::new();
    storage_data.insert(
        "onlyFetchMarkedItems".to_string(),
        TypedValue::Boolean(false),
    );
    storage_data.insert("shouldSaveItems".to_string(), TypedValue::Boolean(true));

    let save = save_with(
        templates,
        vec![GameObjectGroup {
            prefab_name: "StorageLocker".into(),
            objects: vec![entity_at_origin(vec![GameObjectBehavior {
                name: "Storage".into(),
                template_data: Some(storage_data),
                extra_data: vec![StoredItem {
                    name: "IronOre".into(),
                    object: ore,
                }],
                extra_raw: vec![],
            }])],
        }],
    );

    let bytes = write_save_game(&save)?;
    let parsed = parse_save_game(&bytes, true, false)?;

    let storage = &parsed.objects_of("StorageLocker")[0].behaviors[0];
    assert_eq!(storage.extra_data.len(), 1);
    let item = &storage.extra_data[0];
    assert_eq!(item.name, "IronOre");

    let element = item.object.behavior("PrimaryElement").unwrap();
    let mass = element.template_data.as_ref().unwrap()["Mass"]
        .as_f32()
        .unwrap();
    assert!((mass - 100.0).abs() < f32::EPSILON);

    assert_eq!(write_save_game(&parsed)?, bytes);
    Ok(())
}

#[test]
fn test_storage_with_zero_items() -> Result<()> {
    let mut templates = base_templates();
    templates.push(TypeTemplate {
        name: "Storage".into(),
        fields: vec![
            TypeTemplateMember::new(
                "onlyFetchMarkedItems",
                TypeInfo::simple(TypeCode::Boolean),
            ),
            TypeTemplateMember::new("shouldSaveItems", TypeInfo::simple(TypeCode::Boolean)),
        ],
        properties: vec![],
    });

    let mut storage_data = IndexMap::new();
    storage_data.insert(
        "onlyFetchMarkedItems".to_string(),
        TypedValue::Boolean(false),
    );
    storage_data.insert("shouldSaveItems".to_string(), TypedValue::Boolean(true));

    let save = save_with(
        templates,
        vec![GameObjectGroup {
            prefab_name: "StorageLocker".into(),
            objects: vec![entity_at_origin(vec![GameObjectBehavior {
                name: "Storage".into(),
                template_data: Some(storage_data),
                extra_data: vec![],
                extra_raw: vec![],
            }])],
        }],
    );

    let bytes = write_save_game(&save)?;
    let parsed = parse_save_game(&bytes, true, false)?;
    let storage = &parsed.objects_of("StorageLocker")[0].behaviors[0];
    assert!(storage.extra_data.is_empty());
    assert!(storage.extra_raw.is_empty());
    assert_eq!(parsed, save);
    Ok(())
}

#[test]
fn test_behavior_order_preserved() -> Result<()> {
    let mut templates = base_templates();
    for name in ["Health", "KPrefabID"] {
        templates.push(TypeTemplate {
            name: name.into(),
            fields: vec![TypeTemplateMember::new(
                "value",
                TypeInfo::simple(TypeCode::Int32),
            )],
            properties: vec![],
        });
    }

    let behavior = |name: &str, v: i32| {
        let mut data = IndexMap::new();
        data.insert("value".to_string(), TypedValue::Int32(v));
        GameObjectBehavior {
            name: name.into(),
            template_data: Some(data),
            extra_data: vec![],
            extra_raw: vec![],
        }
    };

    let save = save_with(
        templates,
        vec![GameObjectGroup {
            prefab_name: "Minion".into(),
            objects: vec![entity_at_origin(vec![
                behavior("KPrefabID", 10),
                behavior("Health", 20),
            ])],
        }],
    );

    let bytes = write_save_game(&save)?;
    let parsed = parse_save_game(&bytes, true, false)?;
    let names: Vec<_> = parsed.objects_of("Minion")[0]
        .behaviors
        .iter()
        .map(|b| b.name.as_str())
        .collect();
    assert_eq!(names, vec!["KPrefabID", "Health"]);
    Ok(())
}
