//! Solidity interfaces of the market deployments and the tokens they settle.

use {
    crate::error::MarketError,
    alloy::sol,
    model::order::{ReplayGuard, ReplayScheme, SwapOrder},
};

sol! {
    /// Market deployment that protects orders with a per-order salt.
    #[derive(Debug, PartialEq, Eq)]
    interface ISecondaryMarket {
        struct SwapOrder {
            address maker;
            address makerToken;
            uint256 makerAmount;
            address takerToken;
            uint256 takerAmount;
            string salt;
        }

        function executeSwap(SwapOrder calldata order, bytes calldata signature) external;
        function cancelOrder(SwapOrder calldata order) external;
        function getOrderStatus(bytes32 orderHash) external view returns (uint256);
        function eip712Domain() external view returns (
            bytes1 fields,
            string name,
            string version,
            uint256 chainId,
            address verifyingContract,
            bytes32 salt,
            uint256[] extensions
        );

        event SwapExecuted(
            address indexed maker,
            address indexed taker,
            string salt,
            address makerToken,
            uint256 makerAmount,
            address takerToken,
            uint256 takerAmount
        );
        event OrderCancelled(
            address indexed maker,
            address indexed makerToken,
            string salt,
            uint256 makerAmount,
            address takerToken,
            uint256 takerAmount
        );

        error SecondaryMarket__InvalidMaker();
        error SecondaryMarket__InvalidMakerToken();
        error SecondaryMarket__InvalidTakerToken();
        error SecondaryMarket__InvalidMakerAmount();
        error SecondaryMarket__InvalidTakerAmount();
        error SecondaryMarket__InvalidSignature();
        error SecondaryMarket__OrderAlreadyCancelled(bytes32 orderHash);
        error SecondaryMarket__OrderAlreadyFilled(bytes32 orderHash);
        error ECDSAInvalidSignature();
        error ECDSAInvalidSignatureLength(uint256 length);
        error ECDSAInvalidSignatureS(bytes32 s);
        error ReentrancyGuardReentrantCall();
        error SafeERC20FailedOperation(address token);
    }

    /// Market deployment that protects orders with a per-maker nonce.
    #[derive(Debug, PartialEq, Eq)]
    interface ISecondaryMarketNonce {
        struct SwapOrder {
            address maker;
            address makerToken;
            uint256 makerAmount;
            address takerToken;
            uint256 takerAmount;
            uint256 nonce;
        }

        function executeSwap(SwapOrder calldata order, bytes calldata signature) external;
        function getNonce(address maker) external view returns (uint256);
        function eip712Domain() external view returns (
            bytes1 fields,
            string name,
            string version,
            uint256 chainId,
            address verifyingContract,
            bytes32 salt,
            uint256[] extensions
        );

        event SwapExecuted(
            address indexed maker,
            address indexed taker,
            uint256 nonce,
            address makerToken,
            uint256 makerAmount,
            address takerToken,
            uint256 takerAmount
        );

        error SecondaryMarket__InvalidNonce();
        error SecondaryMarket__CancellationUnsupported();
    }

    /// Errors this engine reports that neither deployed interface declares.
    #[derive(Debug, PartialEq, Eq)]
    interface ISecondaryMarketEngine {
        error SecondaryMarket__InvalidReplayGuard();
    }

    #[derive(Debug, PartialEq, Eq)]
    interface IERC20 {
        function name() external view returns (string);
        function symbol() external view returns (string);
        function totalSupply() external view returns (uint256);
        function balanceOf(address account) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 value) external returns (bool);
        function transfer(address to, uint256 value) external returns (bool);
        function transferFrom(address from, address to, uint256 value) external returns (bool);

        event Transfer(address indexed from, address indexed to, uint256 value);
        event Approval(address indexed owner, address indexed spender, uint256 value);

        error ERC20InsufficientBalance(address sender, uint256 balance, uint256 needed);
        error ERC20InsufficientAllowance(address spender, uint256 allowance, uint256 needed);
        error ERC20InvalidSender(address sender);
        error ERC20InvalidReceiver(address receiver);
        error ERC20InvalidApprover(address approver);
        error ERC20InvalidSpender(address spender);
    }
}

impl From<ISecondaryMarket::SwapOrder> for SwapOrder {
    fn from(order: ISecondaryMarket::SwapOrder) -> Self {
        Self {
            maker: order.maker,
            maker_token: order.makerToken,
            maker_amount: order.makerAmount,
            taker_token: order.takerToken,
            taker_amount: order.takerAmount,
            replay_guard: ReplayGuard::Salt(order.salt),
        }
    }
}

impl From<ISecondaryMarketNonce::SwapOrder> for SwapOrder {
    fn from(order: ISecondaryMarketNonce::SwapOrder) -> Self {
        Self {
            maker: order.maker,
            maker_token: order.makerToken,
            maker_amount: order.makerAmount,
            taker_token: order.takerToken,
            taker_amount: order.takerAmount,
            replay_guard: ReplayGuard::Nonce(order.nonce),
        }
    }
}

impl TryFrom<SwapOrder> for ISecondaryMarket::SwapOrder {
    type Error = MarketError;

    fn try_from(order: SwapOrder) -> Result<Self, Self::Error> {
        let ReplayGuard::Salt(salt) = order.replay_guard else {
            return Err(MarketError::ReplayGuardMismatch(ReplayScheme::Salt));
        };
        Ok(Self {
            maker: order.maker,
            makerToken: order.maker_token,
            makerAmount: order.maker_amount,
            takerToken: order.taker_token,
            takerAmount: order.taker_amount,
            salt,
        })
    }
}

impl TryFrom<SwapOrder> for ISecondaryMarketNonce::SwapOrder {
    type Error = MarketError;

    fn try_from(order: SwapOrder) -> Result<Self, Self::Error> {
        let ReplayGuard::Nonce(nonce) = order.replay_guard else {
            return Err(MarketError::ReplayGuardMismatch(ReplayScheme::Nonce));
        };
        Ok(Self {
            maker: order.maker,
            makerToken: order.maker_token,
            makerAmount: order.maker_amount,
            takerToken: order.taker_token,
            takerAmount: order.taker_amount,
            nonce,
        })
    }
}
