//! Contract interfaces.
//!
//! Overloaded functions (`balanceOf`, `mint`) live in separate interfaces so
//! each gets its own generated call type.

#![allow(missing_docs)]

use alloy::sol;

sol! {
    /// ERC-721 balance query used by the holder checks.
    interface IERC721 {
        function balanceOf(address owner) external view returns (uint256 balance);
    }

    /// ERC-1155 balance query used by the honorary holder checks.
    interface IERC1155 {
        function balanceOf(address account, uint256 id) external view returns (uint256 balance);
    }

    /// Vials contract minted by quantity.
    interface IVials {
        function mint(address to, uint256 quantity) external payable;
        function price() external view returns (uint256 price);
        function maxSupply() external view returns (uint256 supply);
        function totalSupply() external view returns (uint256 supply);
        function paused() external view returns (bool isPaused);
    }

    /// Vials contract minted per vial id.
    interface IVialsById {
        function mint(address to, uint256 id, uint256 quantity) external payable;
        function price() external view returns (uint256 price);
        function getVialSupply(uint256 id) external view returns (uint256 supply);
        function vialsMinted(uint256 id) external view returns (uint256 minted);
        function paused() external view returns (bool isPaused);
    }

    /// Honorary ERC-1155 with one free mint per title.
    interface IHonorary {
        function kingMint(address to) external;
        function queenMint(address to) external;
    }

    /// ENS registry.
    interface IENSRegistry {
        function resolver(bytes32 node) external view returns (address resolverAddress);
    }

    /// ENS resolver (forward and reverse records).
    interface IENSResolver {
        function name(bytes32 node) external view returns (string ensName);
        function addr(bytes32 node) external view returns (address target);
    }
}
