//! Isolated network for the batch compute pool.
//!
//! Two availability zones, each with one public and one private-with-egress
//! `/24` subnet. A single NAT gateway in the first public subnet serves both
//! private subnets; this trades availability for cost. The security group
//! allows all outbound traffic and declares no inbound rule.

use sanders_common::constants::TAG_NAME;
use sanders_common::error::{InfraError, Result};
use sanders_common::tags::TagSet;
use sanders_common::types::Environment;
use sanders_manifest::intrinsic::{self, Reference};
use sanders_manifest::resource::{ResourceDeclaration, ResourceKind};
use sanders_manifest::scope::Scope;
use sanders_manifest::set::ResourceSet;
use serde_json::json;

use crate::{Component, component_tags, physical_name};

/// Availability zones spanned by the network.
pub const AZ_COUNT: usize = 2;
/// Address block of the whole network.
pub const VPC_CIDR: &str = "10.0.0.0/16";
/// Prefix length of every subnet.
pub const SUBNET_MASK: u8 = 24;

const ANYWHERE: &str = "0.0.0.0/0";

/// Parameters of [`declare`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkProps {
    /// Deployment environment.
    pub environment: Environment,
}

/// Values exposed by the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Network {
    /// Network id.
    pub vpc_id: Reference,
    /// Private subnet ids, one per availability zone.
    pub private_subnet_ids: Vec<Reference>,
    /// Security group id.
    pub security_group_id: Reference,
}

#[derive(Clone, Copy)]
enum SubnetKind {
    Public,
    Private,
}

impl SubnetKind {
    const fn label(self) -> &'static str {
        match self {
            Self::Public => "Public",
            Self::Private => "Private",
        }
    }

    /// Third octet of the subnet's block: public subnets first, then private.
    const fn octet(self, az: usize) -> usize {
        match self {
            Self::Public => az,
            Self::Private => AZ_COUNT + az,
        }
    }
}

/// Declares the network.
///
/// # Errors
///
/// Returns an error if two declarations collide.
pub fn declare(scope: &Scope, id: &str, props: &NetworkProps) -> Result<Component<Network>> {
    let scope = scope.child(id, &component_tags(props.environment));
    let vpc_name = format!("sanders-customer-platform-vpc-{}", props.environment);
    tracing::info!(scope = %scope, vpc = %vpc_name, azs = AZ_COUNT, "declaring network");

    let mut resources = ResourceSet::new();

    let vpc = scope
        .declare("Vpc", ResourceKind::Vpc)
        .property("CidrBlock", json!(VPC_CIDR))
        .property("EnableDnsHostnames", json!(true))
        .property("EnableDnsSupport", json!(true))
        .property("InstanceTenancy", json!("default"))
        .tag(TAG_NAME, &vpc_name);
    let vpc_ref = Reference::of(vpc.logical_id());
    resources.insert(vpc)?;

    let igw = scope
        .declare("InternetGateway", ResourceKind::InternetGateway)
        .tag(TAG_NAME, &vpc_name);
    let igw_ref = Reference::of(igw.logical_id());
    resources.insert(igw)?;

    let attachment = scope
        .declare("VpcGatewayAttachment", ResourceKind::VpcGatewayAttachment)
        .property("VpcId", vpc_ref.to_value())
        .property("InternetGatewayId", igw_ref.to_value());
    let attachment_id = attachment.logical_id().to_owned();
    resources.insert(attachment)?;

    let mut nat_ref = None;
    for az in 0..AZ_COUNT {
        let subnet = Subnet::new(&scope, SubnetKind::Public, az, &vpc_ref, &vpc_name);
        let route = subnet
            .route()
            .property("GatewayId", igw_ref.to_value())
            .depends_on(&attachment_id);
        if az == 0 {
            let eip = subnet
                .declare("Eip", ResourceKind::ElasticIp)
                .property("Domain", json!("vpc"));
            let nat = subnet
                .declare("NatGateway", ResourceKind::NatGateway)
                .property("AllocationId", Reference::attr(eip.logical_id(), "AllocationId").to_value())
                .property("SubnetId", subnet.reference().to_value())
                .depends_on(route.logical_id())
                .depends_on(subnet.association().logical_id());
            nat_ref = Some(Reference::of(nat.logical_id()));
            resources.insert(eip)?;
            resources.insert(nat)?;
        }
        subnet.insert_into(&mut resources, route)?;
    }
    let nat_ref = nat_ref.ok_or_else(|| InfraError::NotFound {
        kind: "NAT gateway",
        id: "network declares no public subnet".into(),
    })?;

    let mut private_subnet_ids = Vec::with_capacity(AZ_COUNT);
    for az in 0..AZ_COUNT {
        let subnet = Subnet::new(&scope, SubnetKind::Private, az, &vpc_ref, &vpc_name);
        let route = subnet.route().property("NatGatewayId", nat_ref.to_value());
        private_subnet_ids.push(subnet.reference());
        subnet.insert_into(&mut resources, route)?;
    }

    let security_group = scope
        .declare("BatchSecurityGroup", ResourceKind::SecurityGroup)
        .property(
            "GroupDescription",
            json!("Security group for AWS Batch compute environment"),
        )
        .property("GroupName", json!(physical_name("batch-sg", props.environment)))
        .property("VpcId", vpc_ref.to_value())
        .property(
            "SecurityGroupEgress",
            json!([{
                "CidrIp": ANYWHERE,
                "Description": "Allow all outbound traffic by default",
                "IpProtocol": "-1",
            }]),
        );
    let security_group_id = Reference::attr(security_group.logical_id(), "GroupId");
    resources.insert(security_group)?;

    Ok(Component {
        resources,
        accessors: Network {
            vpc_id: vpc_ref,
            private_subnet_ids,
            security_group_id,
        },
    })
}

/// One subnet with its route table and association.
struct Subnet {
    scope: Scope,
    subnet: ResourceDeclaration,
    route_table: ResourceDeclaration,
    association: ResourceDeclaration,
}

impl Subnet {
    fn new(parent: &Scope, kind: SubnetKind, az: usize, vpc: &Reference, vpc_name: &str) -> Self {
        let name = format!("{}Subnet{}", kind.label(), az + 1);
        let scope = parent.child(&name, &TagSet::new());
        let display_name = format!("{vpc_name}/{name}");

        let subnet = parent
            .declare(&name, ResourceKind::Subnet)
            .property("VpcId", vpc.to_value())
            .property(
                "AvailabilityZone",
                intrinsic::select(az, intrinsic::get_azs()),
            )
            .property(
                "CidrBlock",
                json!(format!("10.0.{}.0/{SUBNET_MASK}", kind.octet(az))),
            )
            .property(
                "MapPublicIpOnLaunch",
                json!(matches!(kind, SubnetKind::Public)),
            )
            .tag(TAG_NAME, &display_name);
        let route_table = scope
            .declare("RouteTable", ResourceKind::RouteTable)
            .property("VpcId", vpc.to_value())
            .tag(TAG_NAME, &display_name);
        let association = scope
            .declare("RouteTableAssociation", ResourceKind::SubnetRouteTableAssociation)
            .property("RouteTableId", Reference::of(route_table.logical_id()).to_value())
            .property("SubnetId", Reference::of(subnet.logical_id()).to_value());

        Self {
            scope,
            subnet,
            route_table,
            association,
        }
    }

    fn reference(&self) -> Reference {
        Reference::of(self.subnet.logical_id())
    }

    const fn association(&self) -> &ResourceDeclaration {
        &self.association
    }

    fn declare(&self, name: &str, kind: ResourceKind) -> ResourceDeclaration {
        self.scope.declare(name, kind)
    }

    /// The default route, still missing its target.
    fn route(&self) -> ResourceDeclaration {
        self.scope
            .declare("DefaultRoute", ResourceKind::Route)
            .property(
                "RouteTableId",
                Reference::of(self.route_table.logical_id()).to_value(),
            )
            .property("DestinationCidrBlock", json!(ANYWHERE))
    }

    fn insert_into(self, resources: &mut ResourceSet, route: ResourceDeclaration) -> Result<()> {
        resources.insert(self.subnet)?;
        resources.insert(self.route_table)?;
        resources.insert(self.association)?;
        resources.insert(route)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(environment: Environment) -> Component<Network> {
        declare(
            &Scope::root(TagSet::new()),
            "VPCNetwork",
            &NetworkProps { environment },
        )
        .expect("declare")
    }

    #[test]
    fn one_vpc_two_azs_single_nat() {
        let component = build(Environment::Dev);
        let r = &component.resources;
        assert_eq!(r.count_of(ResourceKind::Vpc), 1);
        assert_eq!(r.count_of(ResourceKind::Subnet), 4);
        assert_eq!(r.count_of(ResourceKind::RouteTable), 4);
        assert_eq!(r.count_of(ResourceKind::SubnetRouteTableAssociation), 4);
        assert_eq!(r.count_of(ResourceKind::Route), 4);
        assert_eq!(r.count_of(ResourceKind::NatGateway), 1);
        assert_eq!(r.count_of(ResourceKind::ElasticIp), 1);
        assert_eq!(r.count_of(ResourceKind::InternetGateway), 1);
        assert_eq!(r.count_of(ResourceKind::SecurityGroup), 1);
        assert_eq!(component.accessors.private_subnet_ids.len(), AZ_COUNT);
    }

    #[test]
    fn subnets_are_slash_24_and_split_by_kind() {
        let component = build(Environment::Dev);
        let cidr = |id: &str| {
            component.resources.get(id).expect(id).to_template_value()["Properties"]["CidrBlock"]
                .as_str()
                .map(str::to_owned)
                .expect("cidr")
        };
        assert_eq!(cidr("VPCNetworkPublicSubnet1"), "10.0.0.0/24");
        assert_eq!(cidr("VPCNetworkPublicSubnet2"), "10.0.1.0/24");
        assert_eq!(cidr("VPCNetworkPrivateSubnet1"), "10.0.2.0/24");
        assert_eq!(cidr("VPCNetworkPrivateSubnet2"), "10.0.3.0/24");
        let private = component
            .resources
            .get("VPCNetworkPrivateSubnet1")
            .expect("private")
            .to_template_value();
        assert_eq!(private["Properties"]["MapPublicIpOnLaunch"], false);
    }

    #[test]
    fn private_routes_share_the_nat() {
        let component = build(Environment::Dev);
        for az in 1..=AZ_COUNT {
            let id = format!("VPCNetworkPrivateSubnet{az}DefaultRoute");
            let route = component.resources.get(&id).expect("route").to_template_value();
            assert_eq!(
                route["Properties"]["NatGatewayId"],
                json!({ "Ref": "VPCNetworkPublicSubnet1NatGateway" })
            );
        }
    }

    #[test]
    fn security_group_allows_only_egress() {
        let component = build(Environment::Prod);
        let sg = component
            .resources
            .get("VPCNetworkBatchSecurityGroup")
            .expect("sg")
            .to_template_value();
        assert_eq!(sg["Properties"]["GroupName"], "sanders-batch-sg-prod");
        assert_eq!(sg["Properties"]["SecurityGroupEgress"][0]["IpProtocol"], "-1");
        assert_eq!(sg["Properties"]["SecurityGroupEgress"][0]["CidrIp"], "0.0.0.0/0");
        assert!(sg["Properties"].get("SecurityGroupIngress").is_none());
    }

    #[test]
    fn vpc_is_named_for_the_environment() {
        let component = build(Environment::Prod);
        let vpc = component.resources.get("VPCNetworkVpc").expect("vpc");
        assert_eq!(vpc.tags().get("Name"), Some("sanders-customer-platform-vpc-prod"));
        assert!(vpc.tags().has_mandatory());
    }
}
