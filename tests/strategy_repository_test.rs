mod common;

use assert_matches::assert_matches;

use portfolio_server::domain::validate_associations;
use portfolio_server::storage::repository::{StockRepository, StrategyError, StrategyRepository};
use portfolio_server::storage::{StockInsert, StrategyInsert};

use common::{create_strategy, setup_test_db, stock_repo, strategy_repo};

fn insert(name: &str, parent_id: Option<i64>) -> StrategyInsert {
    StrategyInsert {
        name: name.to_string(),
        description: None,
        parent_id,
    }
}

#[tokio::test]
async fn test_create_top_level_and_child() {
    let pool = setup_test_db().await;
    let repo = strategy_repo(&pool);

    let growth = create_strategy(&repo, "Growth", None).await;
    assert_eq!(growth.parent_id, None);

    let child = create_strategy(&repo, "Growth-Tech", Some(growth.id)).await;
    assert_eq!(child.parent_id, Some(growth.id));
}

#[tokio::test]
async fn test_grandchild_is_rejected() {
    let pool = setup_test_db().await;
    let repo = strategy_repo(&pool);

    let growth = create_strategy(&repo, "Growth", None).await;
    let child = create_strategy(&repo, "Growth-Tech", Some(growth.id)).await;

    let err = repo
        .create(&insert("Growth-Tech-AI", Some(child.id)))
        .await
        .unwrap_err();
    assert_matches!(
        err,
        StrategyError::InvalidHierarchy { offending_id, .. } if offending_id == child.id
    );
}

#[tokio::test]
async fn test_unknown_parent_is_rejected() {
    let pool = setup_test_db().await;
    let repo = strategy_repo(&pool);

    let err = repo.create(&insert("Orphan", Some(999))).await.unwrap_err();
    assert_matches!(err, StrategyError::NotFound(999));
}

#[tokio::test]
async fn test_duplicate_name_is_rejected() {
    let pool = setup_test_db().await;
    let repo = strategy_repo(&pool);

    create_strategy(&repo, "Growth", None).await;
    let err = repo.create(&insert("Growth", None)).await.unwrap_err();
    assert_matches!(err, StrategyError::DuplicateName(name) if name == "Growth");
}

#[tokio::test]
async fn test_list_all_returns_children_in_insertion_order() {
    let pool = setup_test_db().await;
    let repo = strategy_repo(&pool);

    let growth = create_strategy(&repo, "Growth", None).await;
    let tech = create_strategy(&repo, "Growth-Tech", Some(growth.id)).await;
    let value = create_strategy(&repo, "Value", None).await;

    // 必須回傳所有策略而非只有頂層，呼叫端才能重建整棵樹
    let all = repo.list_all().await.unwrap();
    let ids: Vec<i64> = all.iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![growth.id, tech.id, value.id]);

    let children = repo.children_of(growth.id).await.unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].id, tech.id);

    assert!(repo.children_of(value.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_update_rejects_self_parent() {
    let pool = setup_test_db().await;
    let repo = strategy_repo(&pool);

    let growth = create_strategy(&repo, "Growth", None).await;
    let err = repo
        .update(growth.id, &insert("Growth", Some(growth.id)))
        .await
        .unwrap_err();
    assert_matches!(
        err,
        StrategyError::InvalidHierarchy { offending_id, .. } if offending_id == growth.id
    );
}

#[tokio::test]
async fn test_update_rejects_own_child_as_parent() {
    let pool = setup_test_db().await;
    let repo = strategy_repo(&pool);

    let growth = create_strategy(&repo, "Growth", None).await;
    let child = create_strategy(&repo, "Growth-Tech", Some(growth.id)).await;

    let err = repo
        .update(growth.id, &insert("Growth", Some(child.id)))
        .await
        .unwrap_err();
    assert_matches!(err, StrategyError::InvalidHierarchy { .. });
}

#[tokio::test]
async fn test_update_rejects_parent_for_strategy_with_children() {
    let pool = setup_test_db().await;
    let repo = strategy_repo(&pool);

    let growth = create_strategy(&repo, "Growth", None).await;
    create_strategy(&repo, "Growth-Tech", Some(growth.id)).await;
    let value = create_strategy(&repo, "Value", None).await;

    // Growth 底下已有子策略，掛到 Value 之下會出現第三代
    let err = repo
        .update(growth.id, &insert("Growth", Some(value.id)))
        .await
        .unwrap_err();
    assert_matches!(
        err,
        StrategyError::InvalidHierarchy { offending_id, .. } if offending_id == growth.id
    );
}

#[tokio::test]
async fn test_update_reparent_and_rename() {
    let pool = setup_test_db().await;
    let repo = strategy_repo(&pool);

    let growth = create_strategy(&repo, "Growth", None).await;
    let value = create_strategy(&repo, "Value", None).await;
    let child = create_strategy(&repo, "Quality", Some(growth.id)).await;

    let updated = repo
        .update(child.id, &insert("Quality-Value", Some(value.id)))
        .await
        .unwrap();
    assert_eq!(updated.name, "Quality-Value");
    assert_eq!(updated.parent_id, Some(value.id));
}

#[tokio::test]
async fn test_update_rejects_reparent_while_referenced_by_stock() {
    let pool = setup_test_db().await;
    let strategies = strategy_repo(&pool);
    let stocks = stock_repo(&pool);

    let growth = create_strategy(&strategies, "Growth", None).await;
    let tech = create_strategy(&strategies, "Growth-Tech", Some(growth.id)).await;
    let value = create_strategy(&strategies, "Value", None).await;

    stocks
        .create(
            &StockInsert {
                ticker: "AAPL".to_string(),
                name: None,
                quantity: 10,
                acquisition_price: 150.0,
                category: None,
            },
            &[growth.id, tech.id],
        )
        .await
        .unwrap();

    // 改掛到 Value 之下會讓 {Growth, Growth-Tech} 缺少新的直系祖先
    let err = strategies
        .update(tech.id, &insert("Growth-Tech", Some(value.id)))
        .await
        .unwrap_err();
    assert_matches!(
        err,
        StrategyError::InUse { strategy_id, stock_count } if strategy_id == tech.id && stock_count == 1
    );

    // 儲存的關聯集合仍須滿足直系祖先約束
    let tree = strategies.load_tree().await.unwrap();
    let stored = stocks.get_by_ticker("AAPL").await.unwrap().unwrap();
    assert!(validate_associations(&tree, &stored.strategy_ids).is_ok());
}

#[tokio::test]
async fn test_update_rejects_first_parent_while_referenced_by_stock() {
    let pool = setup_test_db().await;
    let strategies = strategy_repo(&pool);
    let stocks = stock_repo(&pool);

    let solo = create_strategy(&strategies, "Solo", None).await;
    let value = create_strategy(&strategies, "Value", None).await;

    stocks
        .create(
            &StockInsert {
                ticker: "MSFT".to_string(),
                name: None,
                quantity: 5,
                acquisition_price: 300.0,
                category: None,
            },
            &[solo.id],
        )
        .await
        .unwrap();

    // 被引用的頂層策略首次掛上父策略同樣會破壞既有集合
    let err = strategies
        .update(solo.id, &insert("Solo", Some(value.id)))
        .await
        .unwrap_err();
    assert_matches!(err, StrategyError::InUse { strategy_id, .. } if strategy_id == solo.id);
}

#[tokio::test]
async fn test_update_allows_rename_and_detach_while_referenced() {
    let pool = setup_test_db().await;
    let strategies = strategy_repo(&pool);
    let stocks = stock_repo(&pool);

    let growth = create_strategy(&strategies, "Growth", None).await;
    let tech = create_strategy(&strategies, "Growth-Tech", Some(growth.id)).await;

    stocks
        .create(
            &StockInsert {
                ticker: "AAPL".to_string(),
                name: None,
                quantity: 10,
                acquisition_price: 150.0,
                category: None,
            },
            &[growth.id, tech.id],
        )
        .await
        .unwrap();

    // 父策略不變時改名不受引用限制
    let renamed = strategies
        .update(tech.id, &insert("Tech", Some(growth.id)))
        .await
        .unwrap();
    assert_eq!(renamed.name, "Tech");

    // 升為頂層不會讓任何集合缺少祖先
    let detached = strategies.update(tech.id, &insert("Tech", None)).await.unwrap();
    assert_eq!(detached.parent_id, None);
}

#[tokio::test]
async fn test_delete_rejects_when_referenced_by_stock() {
    let pool = setup_test_db().await;
    let strategies = strategy_repo(&pool);
    let stocks = stock_repo(&pool);

    let growth = create_strategy(&strategies, "Growth", None).await;
    stocks
        .create(
            &StockInsert {
                ticker: "AAPL".to_string(),
                name: None,
                quantity: 10,
                acquisition_price: 150.0,
                category: None,
            },
            &[growth.id],
        )
        .await
        .unwrap();

    let err = strategies.delete(growth.id).await.unwrap_err();
    assert_matches!(
        err,
        StrategyError::InUse { strategy_id, stock_count } if strategy_id == growth.id && stock_count == 1
    );
}

#[tokio::test]
async fn test_delete_rejects_when_strategy_has_children() {
    let pool = setup_test_db().await;
    let repo = strategy_repo(&pool);

    let growth = create_strategy(&repo, "Growth", None).await;
    create_strategy(&repo, "Growth-Tech", Some(growth.id)).await;

    let err = repo.delete(growth.id).await.unwrap_err();
    assert_matches!(err, StrategyError::HasChildren { child_count: 1, .. });
}

#[tokio::test]
async fn test_delete_succeeds_after_references_removed() {
    let pool = setup_test_db().await;
    let strategies = strategy_repo(&pool);
    let stocks = stock_repo(&pool);

    let growth = create_strategy(&strategies, "Growth", None).await;
    let stock = stocks
        .create(
            &StockInsert {
                ticker: "AAPL".to_string(),
                name: None,
                quantity: 10,
                acquisition_price: 150.0,
                category: None,
            },
            &[growth.id],
        )
        .await
        .unwrap();

    // 清空關聯後即可刪除
    stocks.update(
        stock.stock.id,
        &StockInsert {
            ticker: "AAPL".to_string(),
            name: None,
            quantity: 10,
            acquisition_price: 150.0,
            category: None,
        },
        &[],
    )
    .await
    .unwrap();

    strategies.delete(growth.id).await.unwrap();
    assert!(strategies.get_by_id(growth.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_delete_unknown_strategy() {
    let pool = setup_test_db().await;
    let repo = strategy_repo(&pool);
    assert_matches!(repo.delete(42).await.unwrap_err(), StrategyError::NotFound(42));
}
