//! Semantic field resolution.
//!
//! Maps free-text column headers to canonical [`Role`]s using a prioritised
//! alias table. Each header runs through an ordered chain of
//! [`MatchStrategy`] values (exact alias, substring alias, short keyword); the
//! first strategy that yields a role wins. Resolution never fails: headers no
//! strategy recognises are reported as `unknown` and left out of the
//! [`FieldMapping`].
//!
//! When two headers resolve to the same role, the one that is an exact alias
//! earliest in that role's alias list wins. Headers matched any other way rank
//! last, and ties keep the column seen first.

use std::{collections::BTreeMap, fmt, str::FromStr};

use anyhow::{Result, anyhow};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    data::{Cell, ScalarKind},
    dataset::{RawTable, clean_header},
    dimension::Dimension,
};

/// Canonical semantic category of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Product,
    Customer,
    Region,
    Quantity,
    Profit,
    Amount,
    Cost,
    SeaFreight,
    LandFreight,
    AgencyFee,
    UnitPrice,
    Category,
}

impl Role {
    pub const ALL: [Role; 12] = [
        Role::Product,
        Role::Customer,
        Role::Region,
        Role::Quantity,
        Role::Profit,
        Role::Amount,
        Role::Cost,
        Role::SeaFreight,
        Role::LandFreight,
        Role::AgencyFee,
        Role::UnitPrice,
        Role::Category,
    ];

    /// Cost components summed into total cost.
    pub const COST_COMPONENTS: [Role; 4] = [
        Role::Cost,
        Role::SeaFreight,
        Role::LandFreight,
        Role::AgencyFee,
    ];

    /// Roles of which at least one must be present for any analysis.
    pub const VALUE_ROLES: [Role; 3] = [Role::Quantity, Role::Profit, Role::Amount];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Product => "product",
            Role::Customer => "customer",
            Role::Region => "region",
            Role::Quantity => "quantity",
            Role::Profit => "profit",
            Role::Amount => "amount",
            Role::Cost => "cost",
            Role::SeaFreight => "sea_freight",
            Role::LandFreight => "land_freight",
            Role::AgencyFee => "agency_fee",
            Role::UnitPrice => "unit_price",
            Role::Category => "category",
        }
    }

    fn builtin_aliases(self) -> &'static [&'static str] {
        match self {
            Role::Product => &[
                "SKU", "物料名称", "产品名称", "存货名称", "物料", "单品", "产品", "商品", "货品",
                "品名", "物料编码", "产品编码", "商品名称", "货物名称", "品种", "产品型号", "型号",
                "规格", "product", "product name", "product_name", "item", "item name",
                "material name", "goods",
            ],
            Role::Customer => &[
                "客户名称", "客户", "客户全称", "客户简称", "购买方", "买方", "采购方", "客户代码",
                "客户编码", "客户ID", "买家", "收货方", "收货人", "终端客户", "最终客户", "customer",
                "customer name", "customer_name", "client", "buyer", "account",
            ],
            Role::Region => &[
                "地区", "区域", "省份", "地域", "区域名称", "省市", "城市", "省", "市", "地区名称",
                "销售区域", "配送区域", "region", "area", "province", "territory", "city",
                "sales region",
            ],
            Role::Quantity => &[
                "数量", "销量", "销售数量", "出货量", "发货量", "重量", "净重", "毛重", "吨数", "件数",
                "箱数", "包装数量", "发货数量", "出库数量", "quantity", "qty", "volume", "weight",
                "net weight", "tons", "units sold",
            ],
            Role::Profit => &[
                "毛利", "利润", "毛利润", "毛利额", "利润额", "盈利", "毛利金额", "利润金额", "毛利贡献",
                "利润贡献", "profit", "gross profit", "gross_profit", "margin", "gross margin",
            ],
            Role::Amount => &[
                "金额", "销售额", "含税金额", "销售金额", "总金额", "成交金额", "交易金额", "订单金额",
                "合同金额", "开票金额", "收入", "营业额", "amount", "sales", "sales amount",
                "sales_amount", "revenue", "turnover", "net sales",
            ],
            Role::Cost => &[
                "成本", "成本价", "采购成本", "进货成本", "单位成本", "总成本", "成本金额", "cost",
                "base cost", "material cost", "material_cost", "purchase cost", "cogs",
            ],
            Role::SeaFreight => &[
                "海运费", "海运成本", "海运费用", "海运运费", "sea freight", "sea_freight",
                "ocean freight",
            ],
            Role::LandFreight => &[
                "陆运费", "陆运成本", "陆运费用", "运费", "运输费", "物流费", "配送费", "land freight",
                "land_freight", "freight", "shipping", "logistics",
            ],
            Role::AgencyFee => &[
                "代办费", "代理费", "服务费", "手续费", "佣金", "促销管理费", "仓储费", "agency fee",
                "agency_fee", "commission", "service fee", "handling fee",
            ],
            Role::UnitPrice => &[
                "单价", "价格", "售价", "单位价格", "含税单价", "不含税单价", "unit price",
                "unit_price", "price",
            ],
            Role::Category => &[
                "物料基本分类", "分类", "类别", "产品分类", "商品分类", "品类", "产品类型", "商品类型",
                "category", "product category", "class",
            ],
        }
    }

    /// Short domain keywords tried only after every alias comparison failed.
    fn keywords(self) -> &'static [&'static str] {
        match self {
            Role::Product => &["品", "料", "sku", "物料", "产品", "商品", "货品"],
            Role::Customer => &["客", "户", "买", "购", "收货", "cust"],
            Role::Region => &["地", "区", "省", "市", "域", "zone"],
            Role::Quantity => &["量", "数", "重", "吨", "件", "箱", "qty", "kg"],
            Role::Profit => &["利", "润", "盈"],
            Role::Amount => &["额", "金", "收入", "营业", "amt"],
            Role::Cost => &["本", "价", "成本"],
            Role::UnitPrice => &["价", "单价", "价格"],
            Role::SeaFreight | Role::LandFreight | Role::AgencyFee | Role::Category => &[],
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        let normalized = value.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        Role::ALL
            .iter()
            .copied()
            .find(|role| role.as_str() == normalized)
            .ok_or_else(|| anyhow!("Unknown field role '{value}'"))
    }
}

/// Alias lists per role, in priority order.
#[derive(Debug, Clone)]
pub struct AliasTable {
    aliases: BTreeMap<Role, Vec<String>>,
}

impl Default for AliasTable {
    fn default() -> Self {
        let aliases = Role::ALL
            .iter()
            .map(|role| {
                let list = role
                    .builtin_aliases()
                    .iter()
                    .map(|alias| alias.to_string())
                    .collect();
                (*role, list)
            })
            .collect();
        Self { aliases }
    }
}

impl AliasTable {
    /// Built-in aliases followed by `extra` ones (lower priority).
    pub fn with_extra(extra: &BTreeMap<Role, Vec<String>>) -> Self {
        let mut table = Self::default();
        for (role, additions) in extra {
            let list = table.aliases.entry(*role).or_default();
            for alias in additions {
                let cleaned = clean_header(alias);
                if !cleaned.is_empty() && !list.iter().any(|existing| existing == &cleaned) {
                    list.push(cleaned);
                }
            }
        }
        table
    }

    pub fn aliases(&self, role: Role) -> &[String] {
        self.aliases.get(&role).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Position of `header` in `role`'s alias list when it is an exact alias.
    pub fn priority(&self, role: Role, header: &str) -> Option<usize> {
        let needle = fold(header);
        self.aliases(role)
            .iter()
            .position(|alias| fold(alias) == needle)
    }
}

/// One step in the header matching chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    ExactAlias,
    SubstringAlias,
    Keyword,
}

impl MatchStrategy {
    pub const CHAIN: [MatchStrategy; 3] = [
        MatchStrategy::ExactAlias,
        MatchStrategy::SubstringAlias,
        MatchStrategy::Keyword,
    ];

    /// Returns the first role (in [`Role::ALL`] order) this strategy assigns
    /// to an already-folded header.
    pub fn apply(self, folded: &str, table: &AliasTable) -> Option<Role> {
        match self {
            MatchStrategy::ExactAlias => Role::ALL.into_iter().find(|role| {
                table
                    .aliases(*role)
                    .iter()
                    .any(|alias| fold(alias) == folded)
            }),
            MatchStrategy::SubstringAlias => Role::ALL.into_iter().find(|role| {
                table.aliases(*role).iter().any(|alias| {
                    let alias = fold(alias);
                    folded.contains(alias.as_str())
                        || (folded.chars().count() >= 2 && alias.contains(folded))
                })
            }),
            MatchStrategy::Keyword => Role::ALL
                .into_iter()
                .find(|role| role.keywords().iter().any(|kw| folded.contains(kw))),
        }
    }
}

fn fold(value: &str) -> String {
    clean_header(value).to_lowercase()
}

/// Outcome of matching one header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderMatch {
    pub role: Role,
    pub strategy: MatchStrategy,
}

/// Runs the matcher chain over one header.
pub fn detect_role(header: &str, table: &AliasTable) -> Option<HeaderMatch> {
    let folded = fold(header);
    if folded.is_empty() {
        return None;
    }
    MatchStrategy::CHAIN.into_iter().find_map(|strategy| {
        strategy
            .apply(&folded, table)
            .map(|role| HeaderMatch { role, strategy })
    })
}

/// Role → header assignment for one table. At most one header per role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldMapping {
    fields: BTreeMap<Role, String>,
}

impl FieldMapping {
    pub fn get(&self, role: Role) -> Option<&str> {
        self.fields.get(&role).map(String::as_str)
    }

    pub fn contains(&self, role: Role) -> bool {
        self.fields.contains_key(&role)
    }

    pub fn insert(&mut self, role: Role, header: impl Into<String>) -> Option<String> {
        self.fields.insert(role, header.into())
    }

    pub fn iter(&self) -> impl Iterator<Item = (Role, &str)> + '_ {
        self.fields.iter().map(|(role, header)| (*role, header.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Column index of `role`'s header in `table`.
    pub fn column(&self, table: &RawTable, role: Role) -> Option<usize> {
        self.get(role).and_then(|header| table.column_index(header))
    }

    pub fn cost_components(&self) -> Vec<Role> {
        Role::COST_COMPONENTS
            .into_iter()
            .filter(|role| self.contains(*role))
            .collect()
    }
}

impl FromIterator<(Role, String)> for FieldMapping {
    fn from_iter<T: IntoIterator<Item = (Role, String)>>(iter: T) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

/// Per-column diagnostics reported alongside the mapping.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnInfo {
    pub header: String,
    #[serde(serialize_with = "serialize_role_or_unknown")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_by: Option<MatchStrategy>,
    pub data_type: ScalarKind,
    pub non_null_count: usize,
    pub sample_values: Vec<Cell>,
}

fn serialize_role_or_unknown<S>(role: &Option<Role>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(role.map(Role::as_str).unwrap_or("unknown"))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDetection {
    pub detected_fields: FieldMapping,
    pub column_info: Vec<ColumnInfo>,
    pub total_rows: usize,
    pub total_columns: usize,
}

/// Resolves every header of `table` to a role.
pub fn resolve_fields(table: &RawTable, aliases: &AliasTable, sample_limit: usize) -> FieldDetection {
    let mut mapping = FieldMapping::default();
    let mut priorities: BTreeMap<Role, usize> = BTreeMap::new();
    let mut column_info = Vec::with_capacity(table.column_count());

    for (idx, header) in table.headers().iter().enumerate() {
        let matched = detect_role(header, aliases);
        if let Some(HeaderMatch { role, strategy }) = matched {
            debug!("Header '{header}' resolved to {role} via {strategy:?}");
            let priority = aliases.priority(role, header).unwrap_or(usize::MAX);
            match priorities.get(&role) {
                Some(current) if priority >= *current => {
                    debug!(
                        "Header '{header}' ignored for {role}; '{}' has higher priority",
                        mapping.get(role).unwrap_or_default()
                    );
                }
                _ => {
                    priorities.insert(role, priority);
                    mapping.insert(role, header.clone());
                }
            }
        }

        let sample_values = table
            .column(idx)
            .filter(|cell| !cell.is_empty())
            .take(sample_limit)
            .cloned()
            .collect();
        column_info.push(ColumnInfo {
            header: header.clone(),
            role: matched.map(|m| m.role),
            matched_by: matched.map(|m| m.strategy),
            data_type: table.column_kind(idx),
            non_null_count: table.non_empty_count(idx),
            sample_values,
        });
    }

    FieldDetection {
        detected_fields: mapping,
        column_info,
        total_rows: table.row_count(),
        total_columns: table.column_count(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldValidation {
    pub is_valid: bool,
    pub missing_fields: Vec<Role>,
    pub detected_fields: FieldMapping,
}

/// Checks the grouping role of `dimension` and that at least one value role
/// exists. When none of the value roles is mapped, all of them are listed.
pub fn validate_fields(mapping: &FieldMapping, dimension: Dimension) -> FieldValidation {
    let mut missing = Vec::new();
    let group = dimension.group_role();
    if !mapping.contains(group) {
        missing.push(group);
    }
    if !Role::VALUE_ROLES.iter().any(|role| mapping.contains(*role)) {
        missing.extend(Role::VALUE_ROLES);
    }
    FieldValidation {
        is_valid: missing.is_empty(),
        missing_fields: missing,
        detected_fields: mapping.clone(),
    }
}
