//! 程序入口：初始化日志，把命令行操作转发给目录存储
//!
//! 这里只是存储公开契约的一个瘦消费者，不包含任何业务逻辑

use std::collections::HashMap;

use anyhow::{bail, Context, Result};
use tracing_subscriber::fmt::SubscriberBuilder;

use xuegao_dinghuo::utils::currency::format_cny;
use xuegao_dinghuo::{CatalogStore, ItemDraft, ItemPatch};

const USAGE: &str = "用法: xuegao_dinghuo <命令> [参数]

命令:
  list                       列出目录中的全部商品
  add <名称> <价格> [单位]    新增商品
  update <id> <名称> <价格>   更新商品
  delete <id>                删除商品（同时清理选购数量）
  import <文件>              从JSON文件批量导入
  export                     导出目录到标准输出
  choose                     选择已有的数据文件（需要图形会话）
  new                        创建新的数据文件（需要图形会话）
  file                       显示当前绑定的数据文件
  qty                        显示选购数量
  qty set <id> <数量>        设置单个商品的选购数量
  qty clear                  清空选购数量";

fn main() -> Result<()> {
    // 初始化日志输出（可观测性）
    let _ = SubscriberBuilder::default()
        .with_max_level(tracing::Level::INFO)
        .try_init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut store = CatalogStore::open_default();
    store.init();

    match args.first().map(String::as_str) {
        None | Some("list") => cmd_list(&mut store),
        Some("add") => cmd_add(&mut store, &args[1..]),
        Some("update") => cmd_update(&mut store, &args[1..]),
        Some("delete") => cmd_delete(&mut store, &args[1..]),
        Some("import") => cmd_import(&mut store, &args[1..]),
        Some("export") => {
            println!("{}", store.export_text()?);
            Ok(())
        }
        Some("choose") => match store.choose_data_file()? {
            Some(name) => {
                println!("已绑定数据文件: {}", name);
                Ok(())
            }
            None => {
                println!("未选择文件");
                Ok(())
            }
        },
        Some("new") => match store.create_data_file()? {
            Some(name) => {
                println!("已创建数据文件: {}", name);
                Ok(())
            }
            None => {
                println!("未创建文件");
                Ok(())
            }
        },
        Some("file") => {
            match store.current_file_name() {
                Some(name) => println!("当前数据文件: {}", name),
                None => println!("未绑定数据文件（数据仅保存在内存中）"),
            }
            Ok(())
        }
        Some("qty") => cmd_qty(&mut store, &args[1..]),
        Some("help") | Some("-h") | Some("--help") => {
            println!("{}", USAGE);
            Ok(())
        }
        Some(other) => bail!("未知命令: {}\n\n{}", other, USAGE),
    }
}

fn cmd_list(store: &mut CatalogStore) -> Result<()> {
    let quantities = store.quantities();
    for item in store.items() {
        let qty = quantities.get(&item.id).copied().unwrap_or(0);
        println!(
            "{}  {}  {} / {}  选购×{}",
            item.id,
            item.name,
            format_cny(item.price_cny),
            item.unit,
            qty
        );
    }
    Ok(())
}

fn cmd_add(store: &mut CatalogStore, args: &[String]) -> Result<()> {
    let [name, price, rest @ ..] = args else {
        bail!("用法: add <名称> <价格> [单位]");
    };
    let draft = ItemDraft {
        name: Some(name.clone()),
        price_cny: Some(price.parse().context("价格必须是数字")?),
        unit: rest.first().cloned(),
        ..ItemDraft::default()
    };
    let item = store.add_item(draft)?;
    println!("已新增: {} ({})", item.name, item.id);
    Ok(())
}

fn cmd_update(store: &mut CatalogStore, args: &[String]) -> Result<()> {
    let [id, name, price] = args else {
        bail!("用法: update <id> <名称> <价格>");
    };
    let patch = ItemPatch {
        name: Some(name.clone()),
        price_cny: Some(price.parse().context("价格必须是数字")?),
        ..ItemPatch::default()
    };
    if store.update_item(id, patch)? {
        println!("已更新: {}", id);
    } else {
        bail!("未找到商品: {}", id);
    }
    Ok(())
}

fn cmd_delete(store: &mut CatalogStore, args: &[String]) -> Result<()> {
    let [id] = args else {
        bail!("用法: delete <id>");
    };
    store.delete_item(id)?;
    println!("已删除: {}", id);
    Ok(())
}

fn cmd_import(store: &mut CatalogStore, args: &[String]) -> Result<()> {
    let [path] = args else {
        bail!("用法: import <文件>");
    };
    let text = std::fs::read_to_string(path).with_context(|| format!("读取文件失败: {}", path))?;
    let count = store.import_from_text(&text)?;
    println!("导入成功: {} 条数据", count);
    Ok(())
}

fn cmd_qty(store: &mut CatalogStore, args: &[String]) -> Result<()> {
    match args.first().map(String::as_str) {
        None => {
            let quantities = store.quantities();
            if quantities.is_empty() {
                println!("当前没有选购数量");
            }
            for (id, qty) in quantities {
                println!("{}  ×{}", id, qty);
            }
            Ok(())
        }
        Some("set") => {
            let [_, id, qty] = args else {
                bail!("用法: qty set <id> <数量>");
            };
            let mut quantities: HashMap<String, u32> = store.quantities();
            quantities.insert(id.clone(), qty.parse().context("数量必须是非负整数")?);
            store.save_quantities(quantities);
            println!("已设置: {} ×{}", id, qty);
            Ok(())
        }
        Some("clear") => {
            store.clear_quantities();
            println!("选购数量已清空");
            Ok(())
        }
        Some(other) => bail!("未知的qty子命令: {}", other),
    }
}
